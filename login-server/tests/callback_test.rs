// Integration tests for the OAuth callback listener

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use login_server::{create_callback_router, CallbackState};
use mockito::{Matcher, Server};
use std::path::Path;
use tempfile::TempDir;
use tokenkeep::{HttpConfig, ProviderConfig, TokenCache};
use tokio::sync::watch;
use tower::ServiceExt;

fn test_provider(cache_directory: &Path, token_endpoint: String) -> ProviderConfig {
    ProviderConfig {
        site_id: "example".to_string(),
        client_id: "abc".to_string(),
        client_secret: "s3cret".to_string(),
        authorization_endpoint: "https://idp.example/auth".to_string(),
        token_endpoint,
        scope: "read write".to_string(),
        redirect_base: "http://localhost:8085".to_string(),
        cache_directory: cache_directory.to_path_buf(),
    }
}

fn create_test_app(provider: ProviderConfig) -> (Router, watch::Receiver<bool>) {
    let (done_tx, done_rx) = watch::channel(false);
    let router = create_callback_router(CallbackState {
        provider,
        http: HttpConfig::default(),
        done: done_tx,
    })
    .unwrap();
    (router, done_rx)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_collects_tokens() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "code123".into()),
            Matcher::UrlEncoded(
                "redirect_uri".into(),
                "http://localhost:8085/callback".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"A1","refresh_token":"R1","expires_in":3600}"#)
        .create_async()
        .await;

    let provider = test_provider(temp_dir.path(), format!("{}/token", server.url()));
    let cache = TokenCache::for_provider(&provider);
    let (app, done_rx) = create_test_app(provider);

    let response = app.oneshot(get("/callback?code=code123")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Login complete"));
    mock.assert_async().await;
    assert!(*done_rx.borrow());

    let entry = cache.load().unwrap();
    assert_eq!(entry.access_token.as_deref(), Some("A1"));
    assert_eq!(entry.refresh_token.as_deref(), Some("R1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_exchange_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let provider = test_provider(temp_dir.path(), format!("{}/token", server.url()));
    let cache = TokenCache::for_provider(&provider);
    let (app, done_rx) = create_test_app(provider);

    let response = app.oneshot(get("/callback?code=expired")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response).await.contains("invalid_grant"));
    assert!(!*done_rx.borrow());
    assert!(!cache.exists());
}

#[tokio::test]
async fn test_callback_missing_code() {
    let temp_dir = TempDir::new().unwrap();
    let provider = test_provider(temp_dir.path(), "http://127.0.0.1:9/token".to_string());
    let (app, done_rx) = create_test_app(provider);

    let response = app.oneshot(get("/callback")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Missing 'code' parameter"));
    assert!(!*done_rx.borrow());
}

#[tokio::test]
async fn test_callback_provider_error() {
    let temp_dir = TempDir::new().unwrap();
    let provider = test_provider(temp_dir.path(), "http://127.0.0.1:9/token".to_string());
    let (app, done_rx) = create_test_app(provider);

    let response = app
        .oneshot(get(
            "/callback?error=access_denied&error_description=User+cancelled",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let text = body_text(response).await;
    assert!(text.contains("access_denied"));
    assert!(text.contains("User cancelled"));
    assert!(!*done_rx.borrow());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_under_redirect_base_path() {
    let temp_dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded(
            "redirect_uri".into(),
            "http://localhost:8085/oauth/callback".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"A1","expires_in":3600}"#)
        .create_async()
        .await;

    let mut provider = test_provider(temp_dir.path(), format!("{}/token", server.url()));
    provider.redirect_base = "http://localhost:8085/oauth".to_string();
    let cache = TokenCache::for_provider(&provider);
    let (app, done_rx) = create_test_app(provider);

    let response = app
        .clone()
        .oneshot(get("/callback?code=code123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get("/oauth/callback?code=code123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert_async().await;
    assert!(*done_rx.borrow());
    assert!(cache.exists());
}

#[tokio::test]
async fn test_unknown_path() {
    let temp_dir = TempDir::new().unwrap();
    let provider = test_provider(temp_dir.path(), "http://127.0.0.1:9/token".to_string());
    let (app, _done_rx) = create_test_app(provider);

    let response = app.oneshot(get("/other")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
