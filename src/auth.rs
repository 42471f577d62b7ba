//! OAuth access tokens for the Data and Analytics APIs.
//!
//! A token file holds the client credentials and a long-lived refresh token
//! obtained once through the consent flow. Short-lived access tokens are minted
//! from it at startup and again whenever the current one is about to expire.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::FetchError;

/// Default token endpoint.
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Contents of the token file.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Hands out bearer tokens, refreshing them on demand.
pub struct TokenProvider {
    client: reqwest::Client,
    credentials: StoredCredentials,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(credentials: StoredCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            current: Mutex::new(None),
        }
    }

    /// Read the token file and mint a first access token.
    ///
    /// Failing here means no poll cycle could ever succeed, so callers treat
    /// the error as fatal.
    pub async fn initialize(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("cannot read token file {}: {}", path.display(), e)
        })?;
        let credentials: StoredCredentials = serde_json::from_str(&raw)?;

        let provider = Self::new(credentials);
        provider.bearer().await?;
        info!("OAuth credentials initialized");

        Ok(provider)
    }

    /// A valid access token, refreshed if it expires within a minute.
    pub async fn bearer(&self) -> Result<String, FetchError> {
        let mut current = self.current.lock().await;
        let now = Utc::now();

        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.refresh().await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    async fn refresh(&self) -> Result<AccessToken, FetchError> {
        debug!("Refreshing OAuth access token");

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Auth(format!(
                "token refresh returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token = response.json::<TokenResponse>().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
