pub mod guard;
pub mod handlers;
pub mod session;

use crate::{cli::globals::GlobalArgs, provider::watch};
use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    Extension, Router,
};
use self::session::SessionStore;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "",
};

/// Shared handler state: configuration plus the one session store
#[derive(Debug, Clone)]
pub struct AppState {
    pub globals: GlobalArgs,
    pub store: SessionStore,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing,
        handlers::health::health,
        handlers::sign_in::sign_in_screen,
        handlers::oauth::oauth_redirect,
        handlers::sign_in::sign_in,
        handlers::sign_up::sign_up,
        handlers::verify_otp::verify_otp,
        handlers::verify_otp::resend_otp,
        handlers::forgot_password::forgot_password,
        handlers::reset_password::reset_password,
        handlers::sign_out::sign_out,
        handlers::dashboard::dashboard,
        handlers::profile::get_profile,
        handlers::profile::update_profile,
        handlers::settings::update_password,
        handlers::settings::delete_account,
    ),
    components(schemas(
        handlers::Reply,
        handlers::Navigate,
        handlers::sign_in::SignInRequest,
        handlers::sign_up::SignUpRequest,
        handlers::verify_otp::VerifyOtpRequest,
        handlers::verify_otp::ResendOtpRequest,
        handlers::forgot_password::ForgotPasswordRequest,
        handlers::reset_password::NewPasswordRequest,
        handlers::profile::ProfileForm,
        crate::provider::auth::OtpPurpose,
        crate::provider::profiles::ProfileRecord,
        session::Principal,
    ))
)]
struct ApiDoc;

/// Assemble the application router around a state. Split from `new` so
/// tests can drive it without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::fallback)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("upgrade-insecure-requests"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

pub async fn new(port: u16, globals: GlobalArgs) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    let store = SessionStore::new();

    // initial session query runs concurrently with serving, the store
    // answers "loading" until it resolves
    {
        let globals = globals.clone();
        let store = store.clone();
        tokio::spawn(async move {
            watch::bootstrap(&globals, &store).await;
        });
    }

    watch::spawn(globals.clone(), store.clone());

    let app = router(AppState { globals, store });

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatehouse::session::{Principal, Session, SessionEvent};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state(store: SessionStore) -> AppState {
        AppState {
            globals: GlobalArgs::new("https://id.example.com".to_string()),
            store,
        }
    }

    fn session() -> Session {
        Session {
            access_token: SecretString::from("token".to_string()),
            principal: Principal {
                id: Uuid::new_v4(),
                email: "p@example.com".to_string(),
                email_confirmed_at: Some(Utc::now()),
                created_at: Utc::now(),
                last_sign_in_at: Some(Utc::now()),
            },
        }
    }

    async fn request(app: axum::Router, path: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = request(router(state(SessionStore::new())), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fallback_placeholder_while_loading() {
        let response = request(router(state(SessionStore::new())), "/no-such-route").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_fallback_routes_by_presence() {
        let mut store = SessionStore::new();
        store.feed().send(SessionEvent::Initial(None)).await.unwrap();
        store.changed().await;

        let response = request(router(state(store.clone())), "/no-such-route").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/sign-in");

        store
            .feed()
            .send(SessionEvent::Changed(Some(session())))
            .await
            .unwrap();
        store.changed().await;

        let response = request(router(state(store)), "/no-such-route").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/dashboard");
    }

    #[tokio::test]
    async fn test_protected_route_redirects_when_signed_out() {
        let mut store = SessionStore::new();
        store.feed().send(SessionEvent::Initial(None)).await.unwrap();
        store.changed().await;

        let response = request(router(state(store)), "/profile").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/sign-in?from=%2Fprofile"
        );
    }

    #[tokio::test]
    async fn test_requests_get_an_id() {
        let response = request(router(state(SessionStore::new())), "/health").await;
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_responses_carry_security_headers() {
        let response = request(router(state(SessionStore::new())), "/health").await;
        let headers = response.headers();

        assert_eq!(
            headers.get("content-security-policy").unwrap(),
            "upgrade-insecure-requests"
        );
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
        assert_eq!(
            headers.get("referrer-policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
    }

    #[test]
    fn test_openapi_documents_entry_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

        assert!(doc["paths"]["/"].get("get").is_some());
        assert!(doc["paths"]["/sign-in"].get("get").is_some());
        assert!(doc["paths"]["/sign-in"].get("post").is_some());
        assert!(doc["paths"]["/oauth/{provider}"].get("get").is_some());
    }

    #[tokio::test]
    async fn test_guard_redirect_target_resolves() {
        let mut store = SessionStore::new();
        store.feed().send(SessionEvent::Initial(None)).await.unwrap();
        store.changed().await;

        let app = router(state(store));

        // the entry route a guard redirect points at must answer GET
        let response = request(app.clone(), "/dashboard").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("/sign-in"));

        let response = request(app, location).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
