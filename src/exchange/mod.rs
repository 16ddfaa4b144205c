//! OAuth token endpoint client.
//!
//! Handles exchanging authorization codes and refresh tokens for access tokens.
//! Requests block the calling thread; run them on a blocking task when called
//! from async code.

use crate::config::HttpConfig;
use crate::error::{Result, TokenError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// OAuth token response (standard OAuth 2.0)
///
/// `access_token` and `expires_in` are required; a response without them is
/// rejected rather than filled with defaults.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,

    /// Seconds until the access token expires, relative to the response
    pub expires_in: i64,

    /// Present when the provider issues or rotates a refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenResponse {
    /// Parse a token endpoint body against the response schema
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(TokenError::InvalidResponse)
    }
}

/// Blocking client for one provider's token endpoint
#[derive(Clone, Debug)]
pub struct TokenEndpoint {
    client: reqwest::blocking::Client,
    url: String,
}

impl TokenEndpoint {
    /// Create a client for `url` using the configured request timeout
    pub fn new(url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(http.timeout_seconds))
            .user_agent(concat!("tokenkeep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(url, client))
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(url: impl Into<String>, client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Exchange authorization code for access token
    ///
    /// # Arguments
    /// * `code` - Authorization code from callback
    /// * `client_id` - OAuth client ID
    /// * `client_secret` - OAuth client secret
    /// * `redirect_uri` - Redirect URI used in authorization request
    pub fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        debug!("Exchanging authorization code for token at {}", self.url);

        self.post_form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ])
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        debug!("Refreshing access token at {}", self.url);

        self.post_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
    }

    fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .form(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            warn!(status = %status, "Token endpoint rejected request");
            return Err(TokenError::Rejected { status, body });
        }

        let token_response = TokenResponse::parse(&body)?;

        debug!(
            "Token request successful, has_refresh_token={}, expires_in={}",
            token_response.refresh_token.is_some(),
            token_response.expires_in
        );

        Ok(token_response)
    }
}
