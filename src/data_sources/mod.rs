//! Upstream data sources for the monitored channel.
//!
//! The engine only talks to the [`MetricsFetcher`] trait. [`YouTubeFetcher`]
//! implements it on top of two API clients:
//!
//! - [`youtube`]: YouTube Data API (public statistics)
//! - [`analytics`]: YouTube Analytics API (owner-only reports)
//!
//! Every call fails with [`FetchError::QuotaExhausted`] when the upstream quota
//! is spent, or another [`FetchError`] variant for anything else.

pub mod analytics;
pub mod google;
pub mod youtube;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};

pub use analytics::YouTubeAnalyticsClient;
pub use google::GoogleApi;
pub use youtube::YouTubeDataClient;

use crate::error::FetchError;
use crate::model::{AnalyticsWindow, AudienceBreakdown, ChannelSnapshot, TrafficSource, VideoMetric};

/// Days covered by the audience and traffic breakdowns.
pub const BREAKDOWN_DAYS: i64 = 7;

/// Read access to the monitored channel's metrics.
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    /// Channel-level aggregate counters.
    async fn channel_snapshot(&self, channel_id: &str) -> Result<ChannelSnapshot, FetchError>;

    /// Every uploaded video id of the channel.
    async fn video_ids(&self, channel_id: &str) -> Result<Vec<String>, FetchError>;

    /// Statistics for long-form videos among `video_ids`, in fetch order.
    async fn video_metrics(&self, video_ids: &[String]) -> Result<Vec<VideoMetric>, FetchError>;

    /// Activity for the day `day_offset` days before today, `None` if the
    /// platform has no row for it yet.
    async fn analytics_window(&self, day_offset: i64) -> Result<Option<AnalyticsWindow>, FetchError>;

    /// Viewer percentage by gender over the recent period.
    async fn audience_breakdown(&self) -> Result<AudienceBreakdown, FetchError>;

    /// Views per traffic source over the recent period.
    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, FetchError>;
}

/// [`MetricsFetcher`] backed by the live YouTube APIs.
#[derive(Clone)]
pub struct YouTubeFetcher {
    data: YouTubeDataClient,
    analytics: YouTubeAnalyticsClient,
}

impl YouTubeFetcher {
    pub fn new(data: YouTubeDataClient, analytics: YouTubeAnalyticsClient) -> Self {
        Self { data, analytics }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn breakdown_range() -> (NaiveDate, NaiveDate) {
        let today = Self::today();
        (today - Duration::days(BREAKDOWN_DAYS), today)
    }
}

#[async_trait]
impl MetricsFetcher for YouTubeFetcher {
    async fn channel_snapshot(&self, channel_id: &str) -> Result<ChannelSnapshot, FetchError> {
        self.data.channel_statistics(channel_id).await
    }

    async fn video_ids(&self, channel_id: &str) -> Result<Vec<String>, FetchError> {
        let playlist_id = self.data.uploads_playlist_id(channel_id).await?;
        self.data.playlist_video_ids(&playlist_id).await
    }

    async fn video_metrics(&self, video_ids: &[String]) -> Result<Vec<VideoMetric>, FetchError> {
        self.data.video_metrics(video_ids).await
    }

    async fn analytics_window(&self, day_offset: i64) -> Result<Option<AnalyticsWindow>, FetchError> {
        let day = Self::today() - Duration::days(day_offset);
        self.analytics.daily_activity(day).await
    }

    async fn audience_breakdown(&self) -> Result<AudienceBreakdown, FetchError> {
        let (start, end) = Self::breakdown_range();
        self.analytics.audience_gender(start, end).await
    }

    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, FetchError> {
        let (start, end) = Self::breakdown_range();
        self.analytics.traffic_sources(start, end).await
    }
}
