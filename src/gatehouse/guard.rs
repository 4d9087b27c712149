use crate::gatehouse::{
    handlers::Reply,
    session::{Principal, Session},
    AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};

/// Route guard for protected endpoints, evaluated on every request.
///
/// Yields the current session when one is resolved, answers with a loading
/// placeholder while the initial query is pending, and redirects to the
/// entry route otherwise. Decisions are never cached.
pub struct Authenticated(pub Session);

impl Authenticated {
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.0.principal
    }
}

#[derive(Debug)]
pub enum GateRejection {
    /// Initial session resolution still pending, render a placeholder
    Loading,
    /// No principal, redirect to the entry route carrying the origin
    SignedOut { from: String },
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Reply::message("Resolving session, retry shortly")),
            )
                .into_response(),
            Self::SignedOut { from } => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("from", &from)
                    .finish();

                Redirect::to(&format!("/sign-in?{query}")).into_response()
            }
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // the router always injects the state extension
        let Some(state) = parts.extensions.get::<AppState>() else {
            return Err(GateRejection::Loading);
        };

        if state.store.is_loading() {
            return Err(GateRejection::Loading);
        }

        match state.store.current_session() {
            Some(session) => Ok(Self(session)),
            None => Err(GateRejection::SignedOut {
                from: parts.uri.path().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli::globals::GlobalArgs,
        gatehouse::session::{SessionEvent, SessionStore},
    };
    use axum::{body::Body, http::Request, routing::get, Extension, Router};
    use chrono::Utc;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn guarded(auth: Authenticated) -> String {
        auth.principal().email.clone()
    }

    fn app(store: SessionStore) -> Router {
        let state = AppState {
            globals: GlobalArgs::new("https://id.example.com".to_string()),
            store,
        };

        Router::new()
            .route("/dashboard", get(guarded))
            .layer(Extension(state))
    }

    fn session(email: &str) -> Session {
        Session {
            access_token: SecretString::from("token".to_string()),
            principal: Principal {
                id: Uuid::new_v4(),
                email: email.to_string(),
                email_confirmed_at: Some(Utc::now()),
                created_at: Utc::now(),
                last_sign_in_at: Some(Utc::now()),
            },
        }
    }

    #[tokio::test]
    async fn test_loading_renders_placeholder() {
        let store = SessionStore::new();

        let response = app(store)
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_signed_out_redirects_with_origin() {
        let mut store = SessionStore::new();
        store.feed().send(SessionEvent::Initial(None)).await.unwrap();
        store.changed().await;

        let response = app(store)
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/sign-in?from=%2Fdashboard"
        );
    }

    #[tokio::test]
    async fn test_signed_in_renders() {
        let mut store = SessionStore::new();
        store
            .feed()
            .send(SessionEvent::Changed(Some(session("p@example.com"))))
            .await
            .unwrap();
        store.changed().await;

        let response = app(store)
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
