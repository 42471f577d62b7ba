//! Request plumbing shared by the Google API clients.
//!
//! Both the Data API and the Analytics API report failures as
//!
//! ```json
//! {"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded"}]}}
//! ```
//!
//! Quota and rate-limit reasons are mapped to [`FetchError::QuotaExhausted`];
//! everything else becomes [`FetchError::Upstream`].

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::auth::TokenProvider;
use crate::error::FetchError;

/// Error reasons that mean "stop polling for a while".
const QUOTA_REASONS: [&str; 4] = [
    "quotaExceeded",
    "rateLimitExceeded",
    "dailyLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Map a non-success response to a [`FetchError`].
pub fn classify_error(status: u16, body: &str) -> FetchError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();

    let quota_reason = envelope
        .error
        .errors
        .iter()
        .any(|e| QUOTA_REASONS.contains(&e.reason.as_str()));

    if (status == 403 || status == 429) && quota_reason {
        return FetchError::QuotaExhausted;
    }

    let message = if envelope.error.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        envelope.error.message
    };

    FetchError::Upstream { status, message }
}

/// Authorized JSON GET against a Google API.
#[derive(Clone)]
pub struct GoogleApi {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
}

impl GoogleApi {
    pub fn new(tokens: Arc<TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bearer = self.tokens.bearer().await?;
        let response = self.client.get(url).bearer_auth(bearer).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_error(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %err, "Google API request failed");
        Err(err)
    }
}
