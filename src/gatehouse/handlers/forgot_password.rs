use crate::{
    gatehouse::{
        handlers::{self, Navigate, Reply},
        AppState,
    },
    provider::auth::{self, OtpPurpose},
};
use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// axum handler for requesting a password-recovery code
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Recovery code sent", body = Reply, content_type = "application/json"),
        (status = 400, description = "Invalid input", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    Extension(state): Extension<AppState>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    if !handlers::valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");

        return (StatusCode::BAD_REQUEST, Json(Reply::message("Invalid email")));
    }

    match auth::request_recovery(&state.globals, &payload.email).await {
        Ok(()) => (
            StatusCode::OK,
            Json(
                Reply::message("Check your email for the reset code")
                    .with_redirect(Navigate::verify_otp(&payload.email, OtpPurpose::Recovery)),
            ),
        ),
        Err(e) => handlers::provider_reply(&e),
    }
}
