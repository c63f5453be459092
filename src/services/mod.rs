//! HTTP collaborators of the game client: account sign-up/login and the
//! public rankings table.

mod auth;
mod ranking;

pub use auth::{AuthClient, Identity, LoginRequest, SignupRequest};
pub use ranking::{RankingClient, RankingEntry};

use reqwest::{Response, Url};
use tracing::debug;

use crate::error::ServiceError;

/// Join a relative API path onto the configured base URL, keeping any path
/// prefix the base carries.
fn endpoint(base: &Url, path: &str) -> Result<Url, ServiceError> {
    base.join(path)
        .map_err(|e| ServiceError::InvalidUrl(format!("{base} + {path}: {e}")))
}

/// Pass a 2xx response through; turn anything else into `Rejected` carrying
/// the plain-text body the server explains itself with.
async fn accept(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(%status, body = %body.trim(), "request rejected");
    Err(ServiceError::Rejected {
        status: status.as_u16(),
        message: body.trim().to_string(),
    })
}

fn parse_base(base_url: &str) -> Result<Url, ServiceError> {
    let mut base =
        Url::parse(base_url).map_err(|e| ServiceError::InvalidUrl(format!("{base_url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ServiceError::InvalidUrl(format!(
            "unsupported scheme '{}' in {base_url}",
            base.scheme()
        )));
    }
    // `Url::join` replaces the last segment unless the path ends in a slash.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
