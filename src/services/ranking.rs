use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{accept, endpoint, parse_base};
use crate::error::ServiceError;

/// One row of the rankings table, in the server's field casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Score")]
    pub score: i64,
}

/// Client for `/api/rankings`.
#[derive(Debug, Clone)]
pub struct RankingClient {
    base: Url,
    client: reqwest::Client,
}

impl RankingClient {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Ok(RankingClient {
            base: parse_base(base_url)?,
            client: reqwest::Client::new(),
        })
    }

    /// Fetch the rankings in server order. An empty table may arrive as `null`.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<RankingEntry>, ServiceError> {
        let url = endpoint(&self.base, "api/rankings")?;
        let response = accept(self.client.get(url).send().await?).await?;
        let entries: Option<Vec<RankingEntry>> = response.json().await?;
        let entries = entries.unwrap_or_default();
        debug!(count = entries.len(), "fetched rankings");
        Ok(entries)
    }
}
