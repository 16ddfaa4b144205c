use anyhow::{Context, Result};
use login_server::{bind_address, create_callback_router, CallbackState};
use tokenkeep::config::DEFAULT_CONFIG_PATH;
use tokenkeep::load_config;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_server=info,tokenkeep=info".into()),
        )
        .init();

    // Read configuration from environment
    let config_path = std::env::var("TOKENKEEP_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    let provider = config.provider_config()?;
    let address = bind_address(&provider)?;

    info!(
        site_id = %provider.site_id,
        redirect_uri = %provider.redirect_uri(),
        cache = %provider.cache_path().display(),
        "Configuration loaded"
    );

    println!("Open this URL in your browser to log in:\n\n{}\n", provider.authorization_url());

    let (done_tx, mut done_rx) = watch::channel(false);
    let router = create_callback_router(CallbackState {
        provider,
        http: config.http,
        done: done_tx,
    })?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind callback listener on {}", address))?;
    info!(address = %address, "Waiting for OAuth callback");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = done_rx.wait_for(|done| *done) => info!("Login complete, shutting down"),
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            }
        })
        .await
        .context("Callback listener failed")?;

    Ok(())
}
