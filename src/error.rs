//! Error types for token lifecycle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = TokenError> = std::result::Result<T, E>;

/// Everything that can go wrong while keeping a site's tokens.
///
/// Cache and configuration errors reflect setup problems and are not worth
/// retrying. Endpoint errors (`Rejected`, `Transport`, `InvalidResponse`) are
/// reported once; the caller decides whether to try the whole operation again.
#[derive(Error, Debug)]
pub enum TokenError {
    /// No cache file yet: the login flow has not been completed for this site
    #[error(
        "no token cache at {}; complete the login flow for site '{}' first \
         (run `login-server` or `tokenkeep collect <CODE>`)",
        .path.display(),
        .site_id
    )]
    CacheMissing { site_id: String, path: PathBuf },

    /// Cache file exists but does not hold a token cache entry
    #[error("token cache at {} is corrupt: {}", .path.display(), .source)]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem failure while reading, writing or locking the cache
    #[error("token cache I/O failed at {}: {}", .path.display(), .source)]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Token endpoint answered with a non-2xx status
    #[error("token endpoint rejected the request with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Token endpoint could not be reached
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token endpoint answered 2xx but the body lacks required fields
    #[error("token endpoint returned an invalid token response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// Token endpoint answered with a lifetime that cannot be turned into an
    /// expiry timestamp
    #[error("token endpoint returned an unusable expires_in: {0}")]
    InvalidExpiresIn(i64),

    /// Cache entry has no refresh token to exchange
    #[error("token cache for site '{0}' has no refresh token; log in again")]
    MissingRefreshToken(String),

    /// Cache entry has no access token
    #[error("token cache for site '{0}' has no access token; log in again")]
    MissingAccessToken(String),

    /// Site identifier cannot be used to name a cache file
    #[error("invalid site id '{0}': use ASCII letters, digits, '-', '_' or '.'")]
    InvalidSiteId(String),

    /// Configuration file or environment problem
    #[error("configuration error: {0}")]
    Config(String),
}

impl TokenError {
    /// True for errors that mean the login flow must be run (again).
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            TokenError::CacheMissing { .. }
                | TokenError::MissingRefreshToken(_)
                | TokenError::MissingAccessToken(_)
        )
    }
}
