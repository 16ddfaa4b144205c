//! Local OAuth callback listener.
//!
//! Completes the authorization code flow for one site:
//! 1. User opens the authorization URL printed at startup
//! 2. User authorizes on the provider's site
//! 3. Provider redirects to `{redirect_base}/callback?code=...`
//! 4. Exchange code for tokens and create the token cache
//! 5. Signal the server to shut down

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokenkeep::{HttpConfig, ProviderConfig, TokenManager};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const SUCCESS_PAGE: &str =
    "<html><body><h1>Login complete</h1><p>You can close this window.</p></body></html>";

/// Application error types for the callback endpoint
pub enum AppError {
    BadRequest(String),
    ServerError(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        (status, error_message).into_response()
    }
}

/// Shared state for the callback handler
pub struct CallbackState {
    pub provider: ProviderConfig,
    pub http: HttpConfig,
    /// Flipped to `true` once the token cache has been created
    pub done: watch::Sender<bool>,
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Create the callback router, serving the path of the provider's redirect URI
pub fn create_callback_router(state: CallbackState) -> anyhow::Result<Router> {
    let path = callback_path(&state.provider)?;
    debug!(path = %path, "Routing OAuth callback");

    Ok(Router::new()
        .route(&path, get(oauth_callback))
        .with_state(Arc::new(state)))
}

/// Request path the provider redirects to, including any path prefix of
/// `redirect_base`
pub fn callback_path(provider: &ProviderConfig) -> anyhow::Result<String> {
    let url = url::Url::parse(&provider.redirect_uri())?;
    Ok(url.path().to_string())
}

/// Socket address (`host:port`) to bind for the provider's redirect base
pub fn bind_address(provider: &ProviderConfig) -> anyhow::Result<String> {
    let url = url::Url::parse(&provider.redirect_base)?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("redirect_base '{}' has no host", provider.redirect_base))?;
    let port = url.port_or_known_default().ok_or_else(|| {
        anyhow::anyhow!("redirect_base '{}' has no port", provider.redirect_base)
    })?;
    Ok(format!("{}:{}", host, port))
}

/// GET /callback
///
/// Exchanges the authorization code for tokens and writes the token cache.
/// The exchange blocks, so it runs on the blocking pool.
async fn oauth_callback(
    State(state): State<Arc<CallbackState>>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Html<&'static str>, AppError> {
    let site_id = state.provider.site_id.clone();
    debug!(site_id = %site_id, "OAuth callback received");

    // Check for OAuth errors
    if let Some(error) = callback.error {
        let description = callback
            .error_description
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(
            site_id = %site_id,
            error = %error,
            description = %description,
            "OAuth authorization failed"
        );
        return Err(AppError::BadRequest(format!(
            "OAuth authorization failed: {} - {}",
            error, description
        )));
    }

    let code = callback
        .code
        .ok_or_else(|| AppError::BadRequest("Missing 'code' parameter".to_string()))?;

    let provider = state.provider.clone();
    let http = state.http.clone();
    let result = tokio::task::spawn_blocking(move || -> tokenkeep::Result<()> {
        let manager = TokenManager::new(provider, &http)?;
        manager.tokens_collect(&code)
    })
    .await
    .map_err(|e| {
        error!(site_id = %site_id, error = %e, "Token collection task failed");
        AppError::ServerError(format!("Token collection task failed: {}", e))
    })?;

    result.map_err(|e| {
        error!(site_id = %site_id, error = %e, "Token exchange failed");
        AppError::BadGateway(format!("Failed to exchange authorization code: {}", e))
    })?;

    info!(site_id = %site_id, "OAuth flow completed successfully");
    state.done.send_replace(true);

    Ok(Html(SUCCESS_PAGE))
}
