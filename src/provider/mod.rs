pub mod auth;
pub mod profiles;
pub mod watch;

use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Every provider failure is one flat kind: either the provider answered and
/// denied the operation (its message is surfaced verbatim to the caller), or
/// it could not be reached at all.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{message}")]
    Denied { status: StatusCode, message: String },

    #[error("identity provider unreachable")]
    Unreachable(anyhow::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.into())
    }
}

impl ProviderError {
    /// Extract the provider's error message from a denial response body.
    /// The provider is not consistent about the field name.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();

        let message = match response.json::<Value>().await {
            Ok(body) => ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| body[*key].as_str())
                .map_or_else(|| status.to_string(), ToString::to_string),
            Err(_) => status.to_string(),
        };

        Self::Denied { status, message }
    }
}

pub fn http_client() -> Result<Client, ProviderError> {
    Ok(Client::builder().user_agent(APP_USER_AGENT).build()?)
}

/// Build a provider endpoint URL from the configured base
#[instrument]
pub fn endpoint_url(globals: &GlobalArgs, endpoint: &str) -> Result<String> {
    let url = Url::parse(&globals.provider_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{endpoint}");

    debug!("endpoint URL: {}", endpoint);

    Ok(endpoint_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let globals = GlobalArgs::new("https://id.example.com".to_string());
        let url = endpoint_url(&globals, "/auth/v1/token").unwrap();
        assert_eq!(url, "https://id.example.com:443/auth/v1/token");
    }

    #[test]
    fn test_endpoint_url_keeps_port() {
        let globals = GlobalArgs::new("http://localhost:9999".to_string());
        let url = endpoint_url(&globals, "/rest/v1/profiles").unwrap();
        assert_eq!(url, "http://localhost:9999/rest/v1/profiles");
    }

    #[test]
    fn test_endpoint_url_rejects_unknown_scheme() {
        let globals = GlobalArgs::new("ftp://id.example.com".to_string());
        assert!(endpoint_url(&globals, "/auth/v1/token").is_err());
    }

    #[test]
    fn test_denied_error_displays_message_verbatim() {
        let err = ProviderError::Denied {
            status: StatusCode::BAD_REQUEST,
            message: "Email not confirmed".to_string(),
        };
        assert_eq!(err.to_string(), "Email not confirmed");
    }
}
