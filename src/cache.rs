//! Analytics result cache with a 24-hour validity window.
//!
//! The Analytics API reports with a delay of several days and has a coarse
//! quota, so a day's window is fetched once and reused across many ticks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::AnalyticsWindow;
use crate::storage::Storage;

/// Key under which the daily activity window is cached.
pub const DAILY_ACTIVITY_KEY: &str = "daily_activity";

/// How long a cached entry stays usable.
pub fn cache_ttl() -> Duration {
    Duration::hours(24)
}

/// On-disk shape of a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// RFC 3339 write time.
    timestamp: String,
    data: AnalyticsWindow,
}

/// Cache of analytics windows keyed by name.
#[derive(Clone)]
pub struct AnalyticsCache {
    storage: Storage,
}

impl AnalyticsCache {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn record_name(key: &str) -> String {
        format!("analytics_cache:{}", key)
    }

    /// Return the cached window if it was written less than 24 hours before `now`.
    ///
    /// Missing, unreadable and expired entries all come back as `None`.
    pub async fn get(&self, key: &str, now: DateTime<Utc>) -> Option<AnalyticsWindow> {
        let body = match self.storage.get_record(&Self::record_name(key)).await {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read analytics cache");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&body) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Ignoring unreadable analytics cache entry");
                return None;
            }
        };

        let written = match DateTime::parse_from_rfc3339(&entry.timestamp) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                debug!(key, error = %e, "Ignoring analytics cache entry with bad timestamp");
                return None;
            }
        };

        if now - written < cache_ttl() {
            Some(entry.data)
        } else {
            debug!(key, written = %written, "Analytics cache entry expired");
            None
        }
    }

    /// Overwrite the entry for `key` and persist it immediately.
    ///
    /// A failed write is logged; the caller keeps using the data it computed.
    pub async fn put(&self, key: &str, data: &AnalyticsWindow, now: DateTime<Utc>) {
        let entry = CacheEntry {
            timestamp: now.to_rfc3339(),
            data: *data,
        };

        let body = match serde_json::to_string(&entry) {
            Ok(body) => body,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode analytics cache entry");
                return;
            }
        };

        match self.storage.put_record(&Self::record_name(key), &body, now).await {
            Ok(()) => info!(key, "Analytics cache saved"),
            Err(e) => warn!(key, error = %e, "Failed to persist analytics cache"),
        }
    }
}
