//! OAuth2 authorization-code token keeper for command-line applications.
//!
//! A site is described by a [`ProviderConfig`]. The [`TokenManager`] keeps the
//! site's access/refresh token pair in a per-site cache file and hands out an
//! access token that is valid for at least a few more minutes, refreshing it
//! through the provider's token endpoint when needed.
//!
//! ```no_run
//! use tokenkeep::{HttpConfig, ProviderConfig, TokenManager};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ProviderConfig {
//!     site_id: "example".to_string(),
//!     client_id: "abc".to_string(),
//!     client_secret: "s3cret".to_string(),
//!     authorization_endpoint: "https://idp.example/auth".to_string(),
//!     token_endpoint: "https://idp.example/token".to_string(),
//!     scope: "read write".to_string(),
//!     redirect_base: "http://localhost:8085".to_string(),
//!     cache_directory: "/home/me".into(),
//! };
//!
//! let manager = TokenManager::new(config, &HttpConfig::default())?;
//! let token = manager.access_token()?;
//! println!("Authorization: Bearer {}", token);
//! # Ok(())
//! # }
//! ```

// Cache file repository
pub mod cache;

// Configuration file and environment overrides
pub mod config;

// Error types
pub mod error;

// Token endpoint client
pub mod exchange;

// Token lifecycle
pub mod manager;

// Per-site provider description
pub mod provider;

pub use cache::{TokenCache, TokenCacheEntry};
pub use config::{load_config, HttpConfig, TokenkeepConfig};
pub use error::{Result, TokenError};
pub use exchange::{TokenEndpoint, TokenResponse};
pub use manager::{TokenGrant, TokenManager, EXPIRY_MARGIN_SECS};
pub use provider::ProviderConfig;
