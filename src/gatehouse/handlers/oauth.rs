use crate::{
    gatehouse::{
        handlers::{self, Reply},
        AppState,
    },
    provider::auth,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
    Extension,
};
use serde::Deserialize;
use tracing::instrument;

#[derive(Deserialize, Debug)]
pub struct OauthParams {
    /// Where the provider should send the browser back to
    pub return_to: Option<String>,
}

/// axum handler for third-party sign-in: hands the browser to the
/// provider's authorize endpoint, the rest of the flow is opaque here
#[utoipa::path(
    get,
    path = "/oauth/{provider}",
    params(
        ("provider" = String, Path, description = "OAuth provider name, for example google"),
        ("return_to" = Option<String>, Query, description = "Where the provider should send the browser back to"),
    ),
    responses(
        (status = 303, description = "Redirect to the provider's authorize endpoint"),
        (status = 400, description = "Unknown OAuth provider", body = Reply),
    ),
    tag = "auth"
)]
#[instrument(skip(state))]
pub async fn oauth_redirect(
    Extension(state): Extension<AppState>,
    Path(oauth_provider): Path<String>,
    Query(params): Query<OauthParams>,
) -> impl IntoResponse {
    if oauth_provider.is_empty() || !oauth_provider.chars().all(char::is_alphanumeric) {
        return (
            StatusCode::BAD_REQUEST,
            Json(Reply::message("Unknown OAuth provider")),
        )
            .into_response();
    }

    let return_to = params.return_to.as_deref().unwrap_or("/dashboard");

    match auth::authorize_url(&state.globals, &oauth_provider, return_to) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => handlers::provider_reply(&e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_provider_name_shape() {
        assert!("google".chars().all(char::is_alphanumeric));
        assert!(!"../evil".chars().all(char::is_alphanumeric));
    }
}
