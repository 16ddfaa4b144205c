//! Per-site token cache.
//!
//! The cache file is the only place token state lives between invocations.
//! Every [`TokenCache::load`] goes to disk; nothing is kept in memory.
//!
//! # Layout
//!
//! ```text
//! {cache_directory}/.{site_id}.yaml    owner read/write only
//! {cache_directory}/.{site_id}.lock    advisory lock for refreshes
//! ```
//!
//! ```yaml
//! access_token: ya29.a0Af...
//! refresh_token: 1//0gJ...
//! client_id: abc
//! client_secret: s3cret
//! expires: 1760630400
//! ```

use crate::error::{Result, TokenError};
use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

mod storage;

/// Token state for one site, as persisted in the cache file.
///
/// `client_id` and `client_secret` are duplicated from the provider
/// configuration so a refresh can run from the cache alone.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheEntry {
    /// Current bearer token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Long-lived token used to mint new access tokens
    #[serde(default)]
    pub refresh_token: Option<String>,

    pub client_id: String,

    pub client_secret: String,

    /// When the access token expires (Unix seconds)
    #[serde(rename = "expires")]
    pub expires_at: i64,
}

impl fmt::Debug for TokenCacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCacheEntry")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("client_id", &self.client_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// File-backed repository for one site's [`TokenCacheEntry`].
#[derive(Clone, Debug)]
pub struct TokenCache {
    site_id: String,
    path: PathBuf,
}

impl TokenCache {
    /// Repository over an explicit cache file path.
    pub fn new(site_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            site_id: site_id.into(),
            path: path.into(),
        }
    }

    /// Repository at the provider's well-known cache location.
    pub fn for_provider(config: &ProviderConfig) -> Self {
        Self::new(config.site_id.clone(), config.cache_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used for the advisory refresh lock.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads and parses the cache file.
    ///
    /// # Returns
    /// * `Ok(TokenCacheEntry)` - Current token state
    /// * `Err(CacheMissing)` - No cache yet; the login flow has not run
    /// * `Err(CacheCorrupt)` - File is not a valid cache entry
    /// * `Err(CacheIo)` - Any other filesystem failure
    pub fn load(&self) -> Result<TokenCacheEntry> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenError::CacheMissing {
                    site_id: self.site_id.clone(),
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(TokenError::CacheIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let entry: TokenCacheEntry =
            serde_yaml::from_slice(&bytes).map_err(|source| TokenError::CacheCorrupt {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            site_id = %self.site_id,
            path = %self.path.display(),
            expires_at = entry.expires_at,
            "Token cache loaded"
        );

        Ok(entry)
    }

    /// Serializes `entry` and atomically replaces the cache file.
    ///
    /// The file is created owner-only before any secret is written to it.
    pub fn save(&self, entry: &TokenCacheEntry) -> Result<()> {
        let yaml = serde_yaml::to_string(entry).map_err(|source| TokenError::CacheCorrupt {
            path: self.path.clone(),
            source,
        })?;

        storage::write_private(&self.path, yaml.as_bytes()).map_err(|source| {
            TokenError::CacheIo {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(
            site_id = %self.site_id,
            path = %self.path.display(),
            expires_at = entry.expires_at,
            "Token cache written"
        );

        Ok(())
    }

    /// Opens the lock file. Take the lock with `.write()` on the result and
    /// hold the guard for the whole read-check-refresh-write sequence.
    pub fn lock_file(&self) -> Result<fd_lock::RwLock<File>> {
        let lock_path = self.lock_path();
        let file = storage::open_private(&lock_path).map_err(|source| TokenError::CacheIo {
            path: lock_path,
            source,
        })?;
        Ok(fd_lock::RwLock::new(file))
    }
}
