//! Token lifecycle: first-time code exchange, expiry checks and refresh.
//!
//! All state lives in the site's [`TokenCache`]; the manager itself only holds
//! the provider description and the token endpoint client.

use crate::cache::{TokenCache, TokenCacheEntry};
use crate::config::HttpConfig;
use crate::error::{Result, TokenError};
use crate::exchange::TokenEndpoint;
use crate::provider::ProviderConfig;
use chrono::Utc;
use tracing::{debug, info, warn};


/// A token is treated as expired this many seconds before it actually is,
/// so it stays valid between the check and its use.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Result of exchanging an authorization code
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until `access_token` expires
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Current time in Unix seconds
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// True when fewer than `margin` seconds remain before `expires_at`
pub fn expires_within(expires_at: i64, now: i64, margin: i64) -> bool {
    expires_at.saturating_sub(now) < margin
}

/// Absolute expiry for a token issued at `now` that lives `expires_in` seconds
pub fn expiry_timestamp(now: i64, expires_in: i64) -> Result<i64> {
    now.checked_add(expires_in).ok_or(TokenError::InvalidExpiresIn(expires_in))
}

/// Owns the token lifecycle for one site
pub struct TokenManager {
    config: ProviderConfig,
    cache: TokenCache,
    endpoint: TokenEndpoint,
}

impl TokenManager {
    /// Create a manager using the provider's cache location and token endpoint
    pub fn new(config: ProviderConfig, http: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let cache = TokenCache::for_provider(&config);
        let endpoint = TokenEndpoint::new(config.token_endpoint.clone(), http)?;
        Ok(Self::with_parts(config, cache, endpoint))
    }

    /// Create a manager with an injected cache repository and endpoint client
    pub fn with_parts(config: ProviderConfig, cache: TokenCache, endpoint: TokenEndpoint) -> Self {
        Self {
            config,
            cache,
            endpoint,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Read the cache entry. A missing cache means the login flow never ran.
    pub fn cache_read(&self) -> Result<TokenCacheEntry> {
        self.cache.load()
    }

    /// Persist `entry` as the site's token state
    pub fn cache_write(&self, entry: &TokenCacheEntry) -> Result<()> {
        self.cache.save(entry)
    }

    /// True when the cached access token has less than
    /// [`EXPIRY_MARGIN_SECS`] of validity left.
    pub fn token_expired(&self) -> Result<bool> {
        let entry = self.cache_read()?;
        let now = now_unix();
        let expired = expires_within(entry.expires_at, now, EXPIRY_MARGIN_SECS);

        debug!(
            site_id = %self.config.site_id,
            remaining_secs = entry.expires_at.saturating_sub(now),
            expired,
            "Checked token expiry"
        );

        Ok(expired)
    }

    /// Exchange the cached refresh token for a new access token and persist it.
    ///
    /// On failure the cache is left untouched and the error returned; there is
    /// no retry.
    pub fn token_refresh(&self) -> Result<()> {
        let mut lock = self.cache.lock_file()?;
        let _guard = lock.write().map_err(|source| TokenError::CacheIo {
            path: self.cache.lock_path(),
            source,
        })?;

        self.refresh_locked()
    }

    /// Return an access token with at least [`EXPIRY_MARGIN_SECS`] of validity,
    /// refreshing first if needed.
    pub fn access_token(&self) -> Result<String> {
        let mut lock = self.cache.lock_file()?;
        let _guard = lock.write().map_err(|source| TokenError::CacheIo {
            path: self.cache.lock_path(),
            source,
        })?;

        if self.token_expired()? {
            self.refresh_locked()?;
        }

        // Read back from disk; the file is the source of truth
        let entry = self.cache_read()?;
        entry
            .access_token
            .ok_or_else(|| TokenError::MissingAccessToken(self.config.site_id.clone()))
    }

    /// Exchange an authorization code for tokens (first login).
    pub fn tokens_get(&self, code: &str) -> Result<TokenGrant> {
        let response = self
            .endpoint
            .exchange_code(
                code,
                &self.config.client_id,
                &self.config.client_secret,
                &self.config.redirect_uri(),
            )
            .map_err(|e| {
                warn!(site_id = %self.config.site_id, error = %e, "Authorization code exchange failed");
                e
            })?;

        Ok(TokenGrant {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        })
    }

    /// Exchange `code` and create the site's cache. Called once per login by
    /// the callback listener.
    pub fn tokens_collect(&self, code: &str) -> Result<()> {
        let grant = self.tokens_get(code)?;
        let expires_at = expiry_timestamp(now_unix(), grant.expires_in)?;

        let entry = TokenCacheEntry {
            access_token: Some(grant.access_token),
            refresh_token: grant.refresh_token,
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
            expires_at,
        };
        self.cache_write(&entry)?;

        info!(
            site_id = %self.config.site_id,
            path = %self.cache.path().display(),
            has_refresh_token = entry.refresh_token.is_some(),
            expires_in = grant.expires_in,
            "Login completed, token cache created"
        );

        Ok(())
    }

    fn refresh_locked(&self) -> Result<()> {
        let mut entry = self.cache_read()?;
        let refresh_token = entry
            .refresh_token
            .clone()
            .ok_or_else(|| TokenError::MissingRefreshToken(self.config.site_id.clone()))?;

        let response = self
            .endpoint
            .refresh(&refresh_token, &entry.client_id, &entry.client_secret)
            .map_err(|e| {
                warn!(site_id = %self.config.site_id, error = %e, "Token refresh failed");
                e
            })?;

        let expires_at = expiry_timestamp(now_unix(), response.expires_in)?;
        let rotated = response.refresh_token.is_some();
        entry.access_token = Some(response.access_token);
        entry.expires_at = expires_at;
        if let Some(new_refresh_token) = response.refresh_token {
            entry.refresh_token = Some(new_refresh_token);
        }
        self.cache_write(&entry)?;

        info!(
            site_id = %self.config.site_id,
            expires_in = response.expires_in,
            rotated_refresh_token = rotated,
            "Access token refreshed"
        );

        Ok(())
    }
}
