//! OAuth provider configuration.
//!
//! Describes one OAuth 2.0 integration and derives the values the login flow
//! needs from it: redirect URI, authorization URL and cache file location.

use crate::error::{Result, TokenError};
use std::fmt;
use std::path::PathBuf;

/// Path the callback listener serves, appended to `redirect_base`
pub const CALLBACK_PATH: &str = "/callback";

/// Extension of the per-site cache file
pub const CACHE_EXTENSION: &str = "yaml";

/// OAuth provider configuration for a single site
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Site identifier, names the cache file
    pub site_id: String,

    /// Client ID issued by the provider
    pub client_id: String,

    /// Client secret issued by the provider
    pub client_secret: String,

    /// OAuth authorization endpoint URL
    pub authorization_endpoint: String,

    /// OAuth token exchange endpoint URL
    pub token_endpoint: String,

    /// Scope string, passed verbatim
    pub scope: String,

    /// Local address the callback listener binds to (e.g. `http://localhost:8085`)
    pub redirect_base: String,

    /// Directory holding the cache file
    pub cache_directory: PathBuf,
}

impl ProviderConfig {
    /// Redirect URI registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.redirect_base.trim_end_matches('/'), CALLBACK_PATH)
    }

    /// Build the browser-facing authorization URL
    pub fn authorization_url(&self) -> String {
        let separator = if self.authorization_endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.authorization_endpoint,
            separator,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&self.scope)
        )
    }

    /// Location of this site's cache file. Does not touch the filesystem.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_directory
            .join(format!(".{}.{}", self.site_id, CACHE_EXTENSION))
    }

    /// Reject site identifiers that cannot safely name a file.
    pub fn validate(&self) -> Result<()> {
        if is_valid_site_id(&self.site_id) {
            Ok(())
        } else {
            Err(TokenError::InvalidSiteId(self.site_id.clone()))
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
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

/// Check if a site id is usable as part of a file name
pub fn is_valid_site_id(site_id: &str) -> bool {
    !site_id.is_empty()
        && site_id != "."
        && site_id != ".."
        && site_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
