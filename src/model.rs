//! Data models for Channel Pulse.
//!
//! Everything the engine observes about the monitored channel is expressed with
//! the types in this module:
//!
//! - [`ChannelSnapshot`]: channel-level aggregate counters, fetched every tick
//! - [`VideoMetric`]: per-video counters for long-form uploads
//! - [`AnalyticsWindow`]: one day of Analytics API metrics
//! - [`ReportBaseline`]: the state captured when the last digest was sent
//! - [`ChangeEvent`]: a discrete, notifiable change between two ticks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Videos at or below this duration are short-form and are never tracked.
pub const MIN_TRACKED_DURATION_SECS: f64 = 320.0;

/// Identifier of the Telegram chat that receives notifications.
pub type ChatId = i64;

/// A single point-in-time read of channel-level aggregate counters.
///
/// Produced fresh on every fetch and never persisted; the engine only diffs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Current subscriber count.
    pub subscriber_count: u64,

    /// Lifetime view count across the channel.
    pub total_view_count: u64,

    /// Number of uploaded videos.
    pub video_count: u64,
}

/// Statistics for a single tracked video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetric {
    /// Platform video identifier.
    pub video_id: String,

    /// Video title as shown on the platform.
    pub title: String,

    /// Lifetime view count.
    pub view_count: u64,

    /// Lifetime like count.
    pub like_count: u64,

    /// Lifetime dislike count (the public API usually reports 0).
    pub dislike_count: u64,

    /// Lifetime comment count.
    pub comment_count: u64,

    /// Video length in seconds.
    pub duration_seconds: f64,
}

impl VideoMetric {
    /// Whether the video is long enough to be tracked.
    pub fn is_tracked(&self) -> bool {
        self.duration_seconds > MIN_TRACKED_DURATION_SECS
    }

    /// The counters recorded in a [`ReportBaseline`] for this video.
    pub fn counters(&self) -> VideoCounters {
        VideoCounters {
            view_count: self.view_count,
            like_count: self.like_count,
            dislike_count: self.dislike_count,
            comment_count: self.comment_count,
        }
    }
}

/// One reporting day of Analytics API metrics.
///
/// The window is requested a few days behind "today" because the upstream
/// figures keep changing until processing settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsWindow {
    pub views: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub comments: u64,
    pub shares: u64,
    pub estimated_minutes_watched: u64,

    /// Average view duration in seconds.
    pub average_view_duration: f64,

    pub subscribers_gained: u64,
}

impl AnalyticsWindow {
    /// A window with no views and no gained subscribers is indistinguishable
    /// from one the platform has not processed yet.
    pub fn looks_unprocessed(&self) -> bool {
        self.views == 0 && self.subscribers_gained == 0
    }
}

/// Viewer percentage per gender over the recent audience period.
pub type AudienceBreakdown = BTreeMap<String, f64>;

/// Views attributed to a single traffic source type (e.g. `SUGGESTED`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSource {
    pub source_type: String,
    pub views: u64,
}

/// Per-video counters stored in the report baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCounters {
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub dislike_count: u64,
    #[serde(default)]
    pub comment_count: u64,
}

/// The metrics recorded when the last digest was sent.
///
/// Every field defaults to zero or empty, which is also what a fresh
/// installation loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBaseline {
    #[serde(default)]
    pub subscribers: u64,

    #[serde(default)]
    pub total_views: u64,

    #[serde(default)]
    pub video_stats: BTreeMap<String, VideoCounters>,
}

impl ReportBaseline {
    /// Capture the state that was just reported.
    pub fn capture(snapshot: &ChannelSnapshot, videos: &[VideoMetric]) -> Self {
        Self {
            subscribers: snapshot.subscriber_count,
            total_views: snapshot.total_view_count,
            video_stats: videos
                .iter()
                .map(|v| (v.video_id.clone(), v.counters()))
                .collect(),
        }
    }

    /// Views recorded for a video at the last digest, or 0 if it was unknown.
    pub fn video_views(&self, video_id: &str) -> u64 {
        self.video_stats
            .get(video_id)
            .map(|c| c.view_count)
            .unwrap_or(0)
    }
}

/// A change between two consecutive ticks that is worth a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The subscriber count went up.
    SubscriberIncrease { delta: u64, new_total: u64 },

    /// A known video gained views.
    ViewIncrease {
        video_id: String,
        title: String,
        delta: u64,
        new_total: u64,
    },
}

impl ChangeEvent {
    /// Human-readable notification text.
    pub fn message(&self) -> String {
        match self {
            ChangeEvent::SubscriberIncrease { delta, new_total } => {
                format!("Subscribers up by {}! Now: {}", delta, new_total)
            }
            ChangeEvent::ViewIncrease {
                title,
                delta,
                new_total,
                ..
            } => format!(
                "Views on \"{}\" up by {}! Now: {}",
                title, delta, new_total
            ),
        }
    }
}
