use crate::{
    cli::globals::GlobalArgs,
    gatehouse::session::{Principal, Session},
    provider::{self, ProviderError},
};
use anyhow::anyhow;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;
use url::Url;
use utoipa::ToSchema;

/// What an emailed one-time code authorizes: completing a sign-up or
/// resetting a forgotten password.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Signup,
    Recovery,
}

impl OtpPurpose {
    const fn as_verify_type(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Recovery => "recovery",
        }
    }
}

/// Sign-up either opens a session right away (provider configured to
/// auto-confirm) or leaves the account pending email verification.
#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(Session),
    PendingVerification(Principal),
}

fn malformed(what: &str) -> ProviderError {
    ProviderError::Unreachable(anyhow!("Error parsing JSON response: no {what} found"))
}

fn principal_from(value: &Value) -> Result<Principal, ProviderError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ProviderError::Unreachable(anyhow!("Error parsing user object: {e}")))
}

fn session_from(value: &Value) -> Result<Session, ProviderError> {
    let token = value["access_token"]
        .as_str()
        .ok_or_else(|| malformed("access_token"))?;

    let principal = principal_from(&value["user"])?;

    Ok(Session {
        access_token: SecretString::from(token.to_string()),
        principal,
    })
}

fn auth_url(globals: &GlobalArgs, endpoint: &str) -> Result<String, ProviderError> {
    provider::endpoint_url(globals, &format!("/auth/v1{endpoint}"))
        .map_err(ProviderError::Unreachable)
}

/// Password sign-in, opens a new session
#[instrument(skip(globals, password))]
pub async fn sign_in(
    globals: &GlobalArgs,
    email: &str,
    password: &str,
) -> Result<Session, ProviderError> {
    let client = provider::http_client()?;

    let token_url = auth_url(globals, "/token?grant_type=password")?;

    let response = client
        .post(&token_url)
        .header("apikey", globals.provider_key.expose_secret())
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let json_response: Value = response.json().await?;

    session_from(&json_response)
}

/// Create an account. The provider sends the verification code by email
/// unless it is configured to auto-confirm.
#[instrument(skip(globals, password))]
pub async fn sign_up(
    globals: &GlobalArgs,
    email: &str,
    password: &str,
) -> Result<SignUpOutcome, ProviderError> {
    let client = provider::http_client()?;

    let signup_url = auth_url(globals, "/signup")?;

    let response = client
        .post(&signup_url)
        .header("apikey", globals.provider_key.expose_secret())
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let json_response: Value = response.json().await?;

    if json_response["access_token"].is_string() {
        return Ok(SignUpOutcome::SignedIn(session_from(&json_response)?));
    }

    Ok(SignUpOutcome::PendingVerification(principal_from(
        &json_response,
    )?))
}

/// Verify an emailed one-time code, opens a session on success
#[instrument(skip(globals, code))]
pub async fn verify_otp(
    globals: &GlobalArgs,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> Result<Session, ProviderError> {
    let client = provider::http_client()?;

    let verify_url = auth_url(globals, "/verify")?;

    let response = client
        .post(&verify_url)
        .header("apikey", globals.provider_key.expose_secret())
        .json(&json!({
            "email": email,
            "token": code,
            "type": purpose.as_verify_type(),
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let json_response: Value = response.json().await?;

    session_from(&json_response)
}

/// Re-send the sign-up verification code
#[instrument(skip(globals))]
pub async fn resend_signup_code(globals: &GlobalArgs, email: &str) -> Result<(), ProviderError> {
    let client = provider::http_client()?;

    let resend_url = auth_url(globals, "/resend")?;

    let response = client
        .post(&resend_url)
        .header("apikey", globals.provider_key.expose_secret())
        .json(&json!({ "email": email, "type": "signup" }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    Ok(())
}

/// Ask the provider to email a password-recovery code
#[instrument(skip(globals))]
pub async fn request_recovery(globals: &GlobalArgs, email: &str) -> Result<(), ProviderError> {
    let client = provider::http_client()?;

    let recover_url = auth_url(globals, "/recover")?;

    let response = client
        .post(&recover_url)
        .header("apikey", globals.provider_key.expose_secret())
        .json(&json!({ "email": email }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    Ok(())
}

/// Set a new password for the session's principal
#[instrument(skip(globals, token, password))]
pub async fn update_password(
    globals: &GlobalArgs,
    token: &SecretString,
    password: &str,
) -> Result<Principal, ProviderError> {
    let client = provider::http_client()?;

    let user_url = auth_url(globals, "/user")?;

    let response = client
        .put(&user_url)
        .header("apikey", globals.provider_key.expose_secret())
        .bearer_auth(token.expose_secret())
        .json(&json!({ "password": password }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let json_response: Value = response.json().await?;

    principal_from(&json_response)
}

/// Fetch the principal a token belongs to. Used by the startup query and
/// the session watcher, a denial means the remote session is gone.
#[instrument(skip(globals, token))]
pub async fn current_user(
    globals: &GlobalArgs,
    token: &SecretString,
) -> Result<Principal, ProviderError> {
    let client = provider::http_client()?;

    let user_url = auth_url(globals, "/user")?;

    let response = client
        .get(&user_url)
        .header("apikey", globals.provider_key.expose_secret())
        .bearer_auth(token.expose_secret())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    let json_response: Value = response.json().await?;

    principal_from(&json_response)
}

/// Revoke the session token. The caller clears local state regardless of
/// what the provider reports.
#[instrument(skip(globals, token))]
pub async fn sign_out(globals: &GlobalArgs, token: &SecretString) -> Result<(), ProviderError> {
    let client = provider::http_client()?;

    let logout_url = auth_url(globals, "/logout")?;

    let response = client
        .post(&logout_url)
        .header("apikey", globals.provider_key.expose_secret())
        .bearer_auth(token.expose_secret())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(response).await);
    }

    Ok(())
}

/// Authorize URL for the third-party OAuth redirect flow. The browser is
/// sent here and the rest of the flow is opaque to the gateway.
pub fn authorize_url(
    globals: &GlobalArgs,
    oauth_provider: &str,
    redirect_to: &str,
) -> Result<String, ProviderError> {
    let base = auth_url(globals, "/authorize")?;

    let mut url =
        Url::parse(&base).map_err(|e| ProviderError::Unreachable(anyhow!("bad base URL: {e}")))?;

    url.query_pairs_mut()
        .append_pair("provider", oauth_provider)
        .append_pair("redirect_to", redirect_to);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_purpose_verify_type() {
        assert_eq!(OtpPurpose::Signup.as_verify_type(), "signup");
        assert_eq!(OtpPurpose::Recovery.as_verify_type(), "recovery");
    }

    #[test]
    fn test_otp_purpose_wire_format() {
        assert_eq!(
            serde_json::to_string(&OtpPurpose::Recovery).unwrap(),
            "\"recovery\""
        );
        let parsed: OtpPurpose = serde_json::from_str("\"signup\"").unwrap();
        assert_eq!(parsed, OtpPurpose::Signup);
    }

    #[test]
    fn test_session_from_token_response() {
        let body = json!({
            "access_token": "jwt",
            "user": {
                "id": "4b4f6f6a-6a6f-4d6f-8f6a-000000000001",
                "email": "p@example.com",
                "email_confirmed_at": "2024-01-01T00:00:00Z",
                "created_at": "2024-01-01T00:00:00Z",
                "last_sign_in_at": "2024-02-01T00:00:00Z"
            }
        });

        let session = session_from(&body).unwrap();
        assert_eq!(session.principal.email, "p@example.com");
        assert_eq!(session.access_token.expose_secret(), "jwt");
    }

    #[test]
    fn test_session_from_missing_token() {
        let body = json!({ "user": {} });
        assert!(session_from(&body).is_err());
    }

    #[test]
    fn test_principal_tolerates_unconfirmed_email() {
        let body = json!({
            "id": "4b4f6f6a-6a6f-4d6f-8f6a-000000000002",
            "email": "new@example.com",
            "created_at": "2024-01-01T00:00:00Z"
        });

        let principal = principal_from(&body).unwrap();
        assert!(principal.email_confirmed_at.is_none());
        assert!(principal.last_sign_in_at.is_none());
    }

    #[test]
    fn test_authorize_url() {
        let globals = GlobalArgs::new("https://id.example.com".to_string());
        let url = authorize_url(&globals, "google", "https://app.example.com/dashboard").unwrap();

        assert!(url.starts_with("https://id.example.com:443/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fapp.example.com%2Fdashboard"));
    }
}
