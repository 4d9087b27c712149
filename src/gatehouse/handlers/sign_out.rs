use crate::{
    gatehouse::{
        handlers::{Navigate, Reply},
        session::SessionEvent,
        AppState,
    },
    provider::auth,
};
use axum::{http::StatusCode, Extension, Json};
use tracing::{debug, instrument, warn};

/// axum handler for sign-out.
///
/// The local session is cleared regardless of what the provider reports,
/// the caller always lands back on the entry route.
#[utoipa::path(
    post,
    path = "/sign-out",
    responses(
        (status = 200, description = "Signed out", body = Reply, content_type = "application/json"),
    ),
    tag = "auth"
)]
#[instrument(skip(state))]
pub async fn sign_out(Extension(state): Extension<AppState>) -> (StatusCode, Json<Reply>) {
    if let Some(session) = state.store.current_session() {
        if let Err(e) = auth::sign_out(&state.globals, &session.access_token).await {
            debug!("provider sign-out failed, clearing local session anyway: {e}");
        }
    }

    if state
        .store
        .feed()
        .send(SessionEvent::Changed(None))
        .await
        .is_err()
    {
        warn!("session store gone during sign-out");
    }

    (
        StatusCode::OK,
        Json(Reply::message("Signed out").with_redirect(Navigate::to("/"))),
    )
}
