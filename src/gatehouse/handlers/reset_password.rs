use crate::{
    gatehouse::{
        handlers::{self, Navigate, Reply},
        session::{Session, SessionEvent},
        AppState,
    },
    provider::auth,
};
use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct NewPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

/// axum handler for setting a new password after a recovery code.
///
/// Not behind the route guard: the recovery flow opens its session through
/// the OTP verification, this only requires that session to exist.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = NewPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = Reply, content_type = "application/json"),
        (status = 400, description = "Invalid input, no provider call issued", body = Reply),
        (status = 401, description = "No open session", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn reset_password(
    Extension(state): Extension<AppState>,
    payload: Option<Json<NewPasswordRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    if let Some(error) = handlers::password_error(&payload.password, &payload.confirm_password) {
        warn!("password reset rejected locally");

        return (StatusCode::BAD_REQUEST, Json(Reply::message(error)));
    }

    let Some(session) = state.store.current_session() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(Reply::message("Verify the recovery code first")),
        );
    };

    match auth::update_password(&state.globals, &session.access_token, &payload.password).await {
        Ok(principal) => {
            info!(email = %principal.email, "password reset");

            let refreshed = Session {
                access_token: session.access_token,
                principal,
            };

            if state
                .store
                .feed()
                .send(SessionEvent::Changed(Some(refreshed)))
                .await
                .is_err()
            {
                warn!("session store gone, password reset not recorded");
            }

            (
                StatusCode::OK,
                Json(
                    Reply::message("Password reset successful! Redirecting to dashboard...")
                        .with_redirect(Navigate::to("/dashboard")),
                ),
            )
        }

        Err(e) => handlers::provider_reply(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_checks_match_the_forms() {
        assert_eq!(
            handlers::password_error("new-password", "other-password"),
            Some("Passwords do not match")
        );
        assert_eq!(
            handlers::password_error("12345", "12345"),
            Some("Password must be at least 6 characters")
        );
    }
}
