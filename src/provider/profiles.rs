use crate::{
    cli::globals::GlobalArgs,
    provider::{self, ProviderError},
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// One row of the provider-hosted `profiles` table, keyed by the principal
/// id. The gateway holds no copy, every read and write goes to the provider
/// and the last write wins.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// An empty profile for a principal that has never saved one
    #[must_use]
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            full_name: String::new(),
            username: String::new(),
            website: String::new(),
            bio: String::new(),
            updated_at: None,
        }
    }
}

fn rest_url(globals: &GlobalArgs, endpoint: &str) -> Result<String, ProviderError> {
    provider::endpoint_url(globals, &format!("/rest/v1{endpoint}"))
        .map_err(ProviderError::Unreachable)
}

/// Fetch the profile row for a principal, `None` when no row exists yet
#[instrument(skip(globals, token))]
pub async fn fetch(
    globals: &GlobalArgs,
    token: &SecretString,
    id: Uuid,
) -> Result<Option<ProfileRecord>, ProviderError> {
    let client = provider::http_client()?;

    let profiles_url = rest_url(globals, "/profiles")?;

    let response = client
        .get(&profiles_url)
        .query(&[("id", format!("eq.{id}")), ("limit", "1".to_string())])
        .header("apikey", globals.provider_key.expose_secret())
        .bearer_auth(token.expose_secret())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let rows: Vec<ProfileRecord> = response.json().await?;

    Ok(rows.into_iter().next())
}

/// Upsert the profile row. Identical payloads produce identical rows, the
/// merge is delegated to the provider.
#[instrument(skip(globals, token, record))]
pub async fn upsert(
    globals: &GlobalArgs,
    token: &SecretString,
    record: &ProfileRecord,
) -> Result<(), ProviderError> {
    let client = provider::http_client()?;

    let profiles_url = rest_url(globals, "/profiles")?;

    let response = client
        .post(&profiles_url)
        .header("apikey", globals.provider_key.expose_secret())
        .header("Prefer", "resolution=merge-duplicates")
        .bearer_auth(token.expose_secret())
        .json(record)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    Ok(())
}
