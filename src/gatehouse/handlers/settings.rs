use crate::{
    gatehouse::{
        guard::Authenticated,
        handlers::{self, Reply},
        session::{Session, SessionEvent},
        AppState,
    },
    provider::auth,
};
use axum::{http::StatusCode, Extension, Json};
use tracing::{info, instrument, warn};

use super::reset_password::NewPasswordRequest;

/// axum handler for changing the password from the settings screen
#[utoipa::path(
    post,
    path = "/settings/password",
    request_body = NewPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = Reply, content_type = "application/json"),
        (status = 400, description = "Invalid input, no provider call issued", body = Reply),
        (status = 303, description = "No session, redirect to sign-in"),
    ),
    tag = "protected"
)]
#[instrument(skip(state, auth, payload))]
pub async fn update_password(
    Extension(state): Extension<AppState>,
    auth: Authenticated,
    payload: Option<Json<NewPasswordRequest>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    if let Some(error) = handlers::password_error(&payload.password, &payload.confirm_password) {
        warn!("password change rejected locally");

        return (StatusCode::BAD_REQUEST, Json(Reply::message(error)));
    }

    match auth::update_password(&state.globals, &auth.0.access_token, &payload.password).await {
        Ok(principal) => {
            info!(email = %principal.email, "password updated");

            let refreshed = Session {
                access_token: auth.0.access_token,
                principal,
            };

            if state
                .store
                .feed()
                .send(SessionEvent::Changed(Some(refreshed)))
                .await
                .is_err()
            {
                warn!("session store gone, password change not recorded");
            }

            (
                StatusCode::OK,
                Json(Reply::message("Password updated successfully!")),
            )
        }

        Err(e) => handlers::provider_reply(&e),
    }
}

/// axum handler for the account-deletion stub: deletion is a back-office
/// operation, the gateway only answers with the fixed message
#[utoipa::path(
    delete,
    path = "/settings",
    responses(
        (status = 200, description = "Deletion is not self-service", body = Reply, content_type = "application/json"),
        (status = 303, description = "No session, redirect to sign-in"),
    ),
    tag = "protected"
)]
#[instrument(skip(auth))]
pub async fn delete_account(auth: Authenticated) -> (StatusCode, Json<Reply>) {
    info!(email = %auth.principal().email, "account deletion requested");

    (
        StatusCode::OK,
        Json(Reply::message(
            "Account deletion would be handled by your backend",
        )),
    )
}
