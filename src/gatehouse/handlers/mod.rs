pub mod health;
pub use self::health::health;

pub mod sign_in;
pub use self::sign_in::{sign_in, sign_in_screen};

pub mod sign_up;
pub use self::sign_up::sign_up;

pub mod verify_otp;
pub use self::verify_otp::{resend_otp, verify_otp};

pub mod forgot_password;
pub use self::forgot_password::forgot_password;

pub mod reset_password;
pub use self::reset_password::reset_password;

pub mod sign_out;
pub use self::sign_out::sign_out;

pub mod oauth;
pub use self::oauth::oauth_redirect;

pub mod dashboard;
pub use self::dashboard::dashboard;

pub mod profile;
pub use self::profile::{get_profile, update_profile};

pub mod settings;
pub use self::settings::{delete_account, update_password};

// common functions for the handlers
use crate::{
    gatehouse::AppState,
    provider::{auth::OtpPurpose, ProviderError},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
    routing::{delete, get, post},
    Extension, Router,
};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

pub fn routes() -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .route("/sign-in", get(sign_in_screen).post(sign_in))
        .route("/sign-up", post(sign_up))
        .route("/verify-otp", post(verify_otp))
        .route("/verify-otp/resend", post(resend_otp))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/sign-out", post(sign_out))
        .route("/oauth/:provider", get(oauth_redirect))
        .route("/dashboard", get(dashboard))
        .route("/profile", get(get_profile).post(update_profile))
        .route("/settings/password", post(update_password))
        .route("/settings", delete(delete_account))
}

/// Client-side navigation rendered as a response field: where to go next
/// and the hand-off state the target screen needs.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Navigate {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<OtpPurpose>,
}

impl Navigate {
    #[must_use]
    pub fn to(path: &str) -> Self {
        Self {
            to: path.to_string(),
            email: None,
            purpose: None,
        }
    }

    /// Hand-off into the OTP screen
    #[must_use]
    pub fn verify_otp(email: &str, purpose: OtpPurpose) -> Self {
        Self {
            to: "/verify-otp".to_string(),
            email: Some(email.to_string()),
            purpose: Some(purpose),
        }
    }

    /// Hand-off into the password-reset screen after a recovery code
    #[must_use]
    pub fn reset_password(email: &str) -> Self {
        Self {
            to: "/reset-password".to_string(),
            email: Some(email.to_string()),
            purpose: None,
        }
    }
}

/// Uniform response body: a message, an optional navigation target and an
/// optional "verify now" affordance.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Navigate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<Navigate>,
}

impl Reply {
    #[must_use]
    pub fn message(message: &str) -> Self {
        Self {
            message: message.to_string(),
            redirect: None,
            verify: None,
        }
    }

    #[must_use]
    pub fn with_redirect(mut self, redirect: Navigate) -> Self {
        self.redirect = Some(redirect);
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: Navigate) -> Self {
        self.verify = Some(verify);
        self
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Local password checks shared by sign-up and both password-change forms.
/// Checked before any provider call, mismatch first.
pub fn password_error(password: &str, confirm: &str) -> Option<&'static str> {
    if password != confirm {
        return Some("Passwords do not match");
    }

    if password.len() < 6 {
        return Some("Password must be at least 6 characters");
    }

    None
}

/// The provider reports an unconfirmed email only through its free-text
/// message, matched case-insensitively. Brittle, but it is the only signal
/// the provider exposes.
pub fn unconfirmed_email(message: &str) -> bool {
    message.to_lowercase().contains("email not confirmed")
}

/// Render a provider failure: the denial message verbatim with the
/// provider's status, or a generic 502 when it could not be reached.
pub fn provider_reply(err: &ProviderError) -> (StatusCode, Json<Reply>) {
    match err {
        ProviderError::Denied { status, message } => (*status, Json(Reply::message(message))),
        ProviderError::Unreachable(_) => (
            StatusCode::BAD_GATEWAY,
            Json(Reply::message("identity provider unreachable")),
        ),
    }
}

/// axum handler for the landing route
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Entry points for the service", content_type = "application/json"),
    ),
    tag = "gatehouse"
)]
pub async fn landing() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "message": "Welcome",
        "sign_in": "/sign-in",
        "sign_up": "/sign-up",
    }))
}

/// Wildcard fallback: route by session presence, placeholder while the
/// initial query is pending
pub async fn fallback(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.store.is_loading() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Reply::message("Resolving session, retry shortly")),
        )
            .into_response();
    }

    if state.store.current_principal().is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Redirect::to("/sign-in").into_response()
    }
}
