pub mod env;

use crate::error::{Result, TokenError};
use crate::provider::ProviderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "tokenkeep.toml";

/// Complete tokenkeep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TokenkeepConfig {
    pub provider: ProviderSection,
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[provider]` section: one OAuth integration
#[derive(Clone, Deserialize)]
pub struct ProviderSection {
    pub site_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub scope: String,
    pub redirect_base: String,
    /// Defaults to the user's home directory
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("site_id", &self.site_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("scope", &self.scope)
            .field("redirect_base", &self.redirect_base)
            .field("cache_directory", &self.cache_directory)
            .finish()
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for token endpoint calls (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl TokenkeepConfig {
    /// Resolve the provider section into a validated [`ProviderConfig`].
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let cache_directory = match &self.provider.cache_directory {
            Some(dir) => dir.clone(),
            None => dirs_next::home_dir().ok_or_else(|| {
                TokenError::Config(
                    "could not determine home directory; set provider.cache_directory".to_string(),
                )
            })?,
        };

        let config = ProviderConfig {
            site_id: self.provider.site_id.clone(),
            client_id: self.provider.client_id.clone(),
            client_secret: self.provider.client_secret.clone(),
            authorization_endpoint: self.provider.authorization_endpoint.clone(),
            token_endpoint: self.provider.token_endpoint.clone(),
            scope: self.provider.scope.clone(),
            redirect_base: self.provider.redirect_base.clone(),
            cache_directory,
        };
        config.validate()?;

        Ok(config)
    }
}

/// Parse configuration from TOML text
pub fn parse_config(contents: &str) -> Result<TokenkeepConfig> {
    toml::from_str(contents).map_err(|e| TokenError::Config(e.to_string()))
}

/// Load configuration from TOML file, then apply environment overrides
pub fn load_config(path: impl AsRef<Path>) -> Result<TokenkeepConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| TokenError::Config(format!("cannot read {}: {}", path.display(), e)))?;

    let mut config = parse_config(&contents)?;
    env::apply_overrides(&mut config);

    tracing::debug!(
        path = %path.display(),
        site_id = %config.provider.site_id,
        "Configuration loaded"
    );

    Ok(config)
}
