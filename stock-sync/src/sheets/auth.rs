//! OAuth credentials for the spreadsheet API
//!
//! Only validity checks and refresh-token exchange live here. Obtaining the
//! first token (browser consent) is done outside this tool; the result is a
//! JSON token file that [`OAuthToken::load`] reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as already expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// Narrow capability the sheet client needs from a credential source
#[async_trait]
pub trait Credentials: Send + Sync {
    /// A usable access token is present and not expired
    fn valid(&self) -> bool;
    fn expired(&self) -> bool;
    fn refresh_token(&self) -> Option<&str>;
    fn access_token(&self) -> Option<&str>;
    /// Exchange the refresh token for a new access token
    async fn refresh(&mut self) -> Result<()>;
}

/// Make sure `creds` can authorize a request, refreshing when possible
pub async fn ensure_valid<C: Credentials + ?Sized>(creds: &mut C) -> Result<()> {
    if creds.valid() {
        return Ok(());
    }

    if creds.expired() && creds.refresh_token().is_some() {
        debug!("Access token expired, refreshing");
        creds.refresh().await.context("Failed to refresh credentials")?;
        if creds.valid() {
            return Ok(());
        }
    }

    anyhow::bail!("Invalid credentials: provision a new token file and retry")
}

/// Authorized-user token as persisted on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Token file backed credentials
#[derive(Debug, Clone)]
pub struct OAuthToken {
    info: TokenInfo,
    path: Option<PathBuf>,
    http: reqwest::Client,
}

impl OAuthToken {
    pub fn new(info: TokenInfo) -> Self {
        Self {
            info,
            path: None,
            http: reqwest::Client::new(),
        }
    }

    /// Load a token file; refreshed tokens are written back to the same path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        let info: TokenInfo = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", path.display()))?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::new(info)
        })
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.info)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write token file: {}", path.display()))?;
        debug!("Token saved to {}", path.display());
        Ok(())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.info.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

#[async_trait]
impl Credentials for OAuthToken {
    fn valid(&self) -> bool {
        self.info.access_token.is_some() && !self.expired()
    }

    fn expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn refresh_token(&self) -> Option<&str> {
        self.info.refresh_token.as_deref()
    }

    fn access_token(&self) -> Option<&str> {
        self.info.access_token.as_deref()
    }

    async fn refresh(&mut self) -> Result<()> {
        let refresh_token = self
            .info
            .refresh_token
            .clone()
            .context("No refresh token available")?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.info.client_id.as_str()),
            ("client_secret", self.info.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.info.token_uri)
            .form(&params)
            .send()
            .await
            .context("Token refresh request failed")?
            .error_for_status()
            .context("Token endpoint rejected the refresh")?
            .json::<RefreshResponse>()
            .await
            .context("Failed to decode token refresh response")?;

        self.info.access_token = Some(response.access_token);
        self.info.expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rotated) = response.refresh_token {
            self.info.refresh_token = Some(rotated);
        }

        info!("Access token refreshed");
        self.save()
    }
}
