use crate::{
    gatehouse::{
        handlers::{self, Navigate, Reply},
        session::SessionEvent,
        AppState,
    },
    provider::auth::{self, OtpPurpose, SignUpOutcome},
};
use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// axum handler for account creation
#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account created, verification pending or session open", body = Reply, content_type = "application/json"),
        (status = 400, description = "Invalid input, no provider call issued", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn sign_up(
    Extension(state): Extension<AppState>,
    payload: Option<Json<SignUpRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    // local checks first, a failed check must not reach the provider
    if let Some(error) = handlers::password_error(&payload.password, &payload.confirm_password) {
        warn!("sign-up rejected locally");

        return (StatusCode::BAD_REQUEST, Json(Reply::message(error)));
    }

    if !handlers::valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");

        return (StatusCode::BAD_REQUEST, Json(Reply::message("Invalid email")));
    }

    match auth::sign_up(&state.globals, &payload.email, &payload.password).await {
        Ok(SignUpOutcome::PendingVerification(principal)) => {
            info!(email = %principal.email, "sign-up pending verification");

            (
                StatusCode::OK,
                Json(
                    Reply::message("Please check your email for the OTP verification code.")
                        .with_redirect(Navigate::verify_otp(&payload.email, OtpPurpose::Signup)),
                ),
            )
        }

        Ok(SignUpOutcome::SignedIn(session)) => {
            info!(email = %session.principal.email, "sign-up auto-confirmed");

            if state
                .store
                .feed()
                .send(SessionEvent::Changed(Some(session)))
                .await
                .is_err()
            {
                warn!("session store gone, sign-up not recorded");
            }

            (
                StatusCode::OK,
                Json(Reply::message("Account created").with_redirect(Navigate::to("/dashboard"))),
            )
        }

        Err(e) => handlers::provider_reply(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_is_rejected_locally() {
        assert_eq!(
            handlers::password_error("12345", "12345"),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn test_mismatched_confirmation_is_rejected_locally() {
        assert_eq!(
            handlers::password_error("123456", "654321"),
            Some("Passwords do not match")
        );
    }

    #[test]
    fn test_request_parses_confirm_field() {
        let payload: SignUpRequest = serde_json::from_str(
            r#"{ "email": "p@example.com", "password": "secret1", "confirm_password": "secret1" }"#,
        )
        .unwrap();

        assert_eq!(payload.email, "p@example.com");
        assert_eq!(payload.password, payload.confirm_password);
    }
}
