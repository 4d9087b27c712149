use crate::{
    gatehouse::{
        handlers::{self, Navigate, Reply},
        session::SessionEvent,
        AppState,
    },
    provider::auth::{self, OtpPurpose},
};
use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// axum handler for the entry screen, the target of guard redirects
#[utoipa::path(
    get,
    path = "/sign-in",
    responses(
        (status = 200, description = "Entry screen descriptor", content_type = "application/json"),
    ),
    tag = "auth"
)]
pub async fn sign_in_screen() -> impl IntoResponse {
    Json(json!({
        "message": "Enter your credentials to access your account",
        "sign_in": "/sign-in",
        "sign_up": "/sign-up",
        "forgot_password": "/forgot-password",
    }))
}

/// axum handler for password sign-in
#[utoipa::path(
    post,
    path = "/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = Reply, content_type = "application/json"),
        (status = 400, description = "Invalid input", body = Reply),
        (status = 401, description = "Provider denied the credentials", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn sign_in(
    Extension(state): Extension<AppState>,
    payload: Option<Json<SignInRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    if !handlers::valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");

        return (StatusCode::BAD_REQUEST, Json(Reply::message("Invalid email")));
    }

    match auth::sign_in(&state.globals, &payload.email, &payload.password).await {
        Ok(session) => {
            debug!(email = %session.principal.email, "signed in");

            if state
                .store
                .feed()
                .send(SessionEvent::Changed(Some(session)))
                .await
                .is_err()
            {
                warn!("session store gone, sign-in not recorded");
            }

            (
                StatusCode::OK,
                Json(Reply::message("Signed in").with_redirect(Navigate::to("/dashboard"))),
            )
        }

        Err(e) => {
            let (status, Json(mut reply)) = handlers::provider_reply(&e);

            // an unconfirmed email gets a "verify now" affordance into the
            // OTP flow, any other denial is surfaced as-is
            if handlers::unconfirmed_email(&reply.message) {
                reply = reply.with_verify(Navigate::verify_otp(&payload.email, OtpPurpose::Signup));
            }

            (status, Json(reply))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn test_denied_sign_in_gets_verify_affordance() {
        let err = ProviderError::Denied {
            status: StatusCode::BAD_REQUEST,
            message: "Email not confirmed".to_string(),
        };

        let (_, Json(mut reply)) = handlers::provider_reply(&err);
        if handlers::unconfirmed_email(&reply.message) {
            reply = reply.with_verify(Navigate::verify_otp("p@example.com", OtpPurpose::Signup));
        }

        let verify = reply.verify.expect("verify affordance expected");
        assert_eq!(verify.to, "/verify-otp");
        assert_eq!(verify.purpose, Some(OtpPurpose::Signup));
    }

    #[test]
    fn test_other_denials_have_no_affordance() {
        let err = ProviderError::Denied {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid login credentials".to_string(),
        };

        let (status, Json(reply)) = handlers::provider_reply(&err);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.message, "Invalid login credentials");
        assert!(!handlers::unconfirmed_email(&reply.message));
        assert!(reply.verify.is_none());
    }
}
