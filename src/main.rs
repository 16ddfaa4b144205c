use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokenkeep::config::DEFAULT_CONFIG_PATH;
use tokenkeep::manager::{expires_within, now_unix};
use tokenkeep::{load_config, TokenManager, EXPIRY_MARGIN_SECS};
use tracing::info;

#[derive(Parser)]
#[command(name = "tokenkeep", version, about = "Keep an OAuth2 access token fresh for CLI use")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file.
    #[arg(long, global = true, env = "TOKENKEEP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL to open in a browser.
    Url,
    /// Exchange an authorization code and create the token cache.
    Collect {
        /// Code from the `code` query parameter of the redirect.
        code: String,
    },
    /// Print a valid access token, refreshing it first if needed.
    Token,
    /// Refresh the access token now.
    Refresh,
    /// Show token cache state without printing secrets.
    Status,
}

fn main() -> Result<()> {
    // Logs go to stderr so `tokenkeep token` can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokenkeep=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let provider = config.provider_config()?;

    match cli.command {
        Commands::Url => {
            println!("{}", provider.authorization_url());
        }
        Commands::Collect { code } => {
            let manager = TokenManager::new(provider, &config.http)?;
            manager
                .tokens_collect(&code)
                .context("Failed to exchange authorization code")?;
            info!(path = %manager.cache().path().display(), "Token cache created");
        }
        Commands::Token => {
            let manager = TokenManager::new(provider, &config.http)?;
            let token = manager.access_token()?;
            println!("{}", token);
        }
        Commands::Refresh => {
            let manager = TokenManager::new(provider, &config.http)?;
            manager.token_refresh().context("Failed to refresh access token")?;
        }
        Commands::Status => {
            let manager = TokenManager::new(provider, &config.http)?;
            let entry = manager.cache_read()?;
            let now = now_unix();
            let expires = Utc
                .timestamp_opt(entry.expires_at, 0)
                .single()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| entry.expires_at.to_string());

            println!("site:            {}", manager.config().site_id);
            println!("cache:           {}", manager.cache().path().display());
            println!("expires:         {}", expires);
            println!("remaining:       {}s", entry.expires_at.saturating_sub(now));
            println!(
                "refresh due:     {}",
                expires_within(entry.expires_at, now, EXPIRY_MARGIN_SECS)
            );
            println!("refresh token:   {}", entry.refresh_token.is_some());
        }
    }

    Ok(())
}
