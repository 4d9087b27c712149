use crate::{
    gatehouse::{
        handlers::{self, Navigate, Reply},
        session::SessionEvent,
        AppState,
    },
    provider::auth::{self, OtpPurpose},
};
use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Codes are always 6 characters, anything else is rejected locally
pub const OTP_LENGTH: usize = 6;

#[derive(ToSchema, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ResendOtpRequest {
    pub email: String,
    pub purpose: OtpPurpose,
}

/// axum handler for one-time-code verification
#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted, session open", body = Reply, content_type = "application/json"),
        (status = 400, description = "Code rejected", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn verify_otp(
    Extension(state): Extension<AppState>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    if payload.code.len() != OTP_LENGTH {
        warn!("verification code of wrong length");

        return (
            StatusCode::BAD_REQUEST,
            Json(Reply::message("Enter the 6-digit code")),
        );
    }

    match auth::verify_otp(&state.globals, &payload.email, &payload.code, payload.purpose).await {
        Ok(session) => {
            info!(email = %session.principal.email, purpose = ?payload.purpose, "code verified");

            if state
                .store
                .feed()
                .send(SessionEvent::Changed(Some(session)))
                .await
                .is_err()
            {
                warn!("session store gone, verification not recorded");
            }

            let redirect = match payload.purpose {
                OtpPurpose::Signup => Navigate::to("/dashboard"),
                OtpPurpose::Recovery => Navigate::reset_password(&payload.email),
            };

            (
                StatusCode::OK,
                Json(
                    Reply::message("Verification successful! Redirecting...")
                        .with_redirect(redirect),
                ),
            )
        }

        Err(e) => handlers::provider_reply(&e),
    }
}

/// axum handler for re-sending a code
#[utoipa::path(
    post,
    path = "/verify-otp/resend",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Code re-sent", body = Reply, content_type = "application/json"),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn resend_otp(
    Extension(state): Extension<AppState>,
    payload: Option<Json<ResendOtpRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    let sent = match payload.purpose {
        OtpPurpose::Signup => auth::resend_signup_code(&state.globals, &payload.email).await,
        OtpPurpose::Recovery => auth::request_recovery(&state.globals, &payload.email).await,
    };

    match sent {
        Ok(()) => (
            StatusCode::OK,
            Json(Reply::message("OTP resent to your email")),
        ),
        Err(e) => handlers::provider_reply(&e),
    }
}
