use reqwest::Url;
use serde::Serialize;
use tracing::{info, instrument};

use super::{accept, endpoint, parse_base};
use crate::error::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Who the user is once the account service has accepted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Client for `/api/signup` and `/api/login`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base: Url,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Ok(AuthClient {
            base: parse_base(base_url)?,
            client: reqwest::Client::new(),
        })
    }

    /// Register a new account. A successful signup also identifies the user.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<Identity, ServiceError> {
        let url = endpoint(&self.base, "api/signup")?;
        let response = self.client.post(url).json(request).send().await?;
        accept(response).await?;
        info!("signed up");
        Ok(Identity {
            username: request.username.clone(),
        })
    }

    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<Identity, ServiceError> {
        let url = endpoint(&self.base, "api/login")?;
        let response = self.client.post(url).json(request).send().await?;
        accept(response).await?;
        info!("logged in");
        Ok(Identity {
            username: request.username.clone(),
        })
    }
}
