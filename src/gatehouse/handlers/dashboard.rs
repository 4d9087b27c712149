use crate::gatehouse::{guard::Authenticated, session::Principal};
use axum::{response::IntoResponse, Json};
use tracing::instrument;

/// axum handler for the protected dashboard: the signed-in principal,
/// read-only
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Current principal", body = Principal, content_type = "application/json"),
        (status = 303, description = "No session, redirect to sign-in"),
        (status = 503, description = "Session resolution pending"),
    ),
    tag = "protected"
)]
#[instrument(skip(auth))]
pub async fn dashboard(auth: Authenticated) -> impl IntoResponse {
    Json(auth.principal().clone())
}
