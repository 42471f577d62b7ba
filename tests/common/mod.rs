//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use channel_pulse::data_sources::MetricsFetcher;
use channel_pulse::error::FetchError;
use channel_pulse::model::{
    AnalyticsWindow, AudienceBreakdown, ChannelSnapshot, ChatId, TrafficSource, VideoMetric,
};
use channel_pulse::telegram::NotificationSink;

pub fn snapshot(subscribers: u64, total_views: u64) -> ChannelSnapshot {
    ChannelSnapshot {
        subscriber_count: subscribers,
        total_view_count: total_views,
        video_count: 2,
    }
}

pub fn video(id: &str, title: &str, views: u64) -> VideoMetric {
    VideoMetric {
        video_id: id.to_string(),
        title: title.to_string(),
        view_count: views,
        like_count: 1,
        dislike_count: 0,
        comment_count: 0,
        duration_seconds: 600.0,
    }
}

/// Scripted upstream. Tests edit `state` between ticks.
#[derive(Debug, Default)]
pub struct FakeState {
    pub snapshot: ChannelSnapshot,
    pub video_ids: Vec<String>,
    pub videos: Vec<VideoMetric>,
    pub window: Option<AnalyticsWindow>,
    pub audience: AudienceBreakdown,
    pub traffic: Vec<TrafficSource>,

    /// Every call fails with `QuotaExhausted`.
    pub quota_exhausted: bool,
    /// The snapshot call fails with a 500.
    pub snapshot_failure: Option<String>,
    /// Breakdown calls fail with a 500.
    pub breakdown_failure: bool,

    pub snapshot_calls: usize,
    pub listing_calls: usize,
    pub analytics_calls: usize,
}

#[derive(Debug, Default)]
pub struct FakeFetcher {
    pub state: Mutex<FakeState>,
}

impl FakeFetcher {
    pub fn new(snapshot: ChannelSnapshot, videos: Vec<VideoMetric>) -> Self {
        let video_ids = videos.iter().map(|v| v.video_id.clone()).collect();
        Self {
            state: Mutex::new(FakeState {
                snapshot,
                video_ids,
                videos,
                window: Some(AnalyticsWindow {
                    views: 40,
                    likes: 3,
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }

    pub fn edit(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn snapshot_calls(&self) -> usize {
        self.state.lock().unwrap().snapshot_calls
    }

    pub fn listing_calls(&self) -> usize {
        self.state.lock().unwrap().listing_calls
    }

    pub fn analytics_calls(&self) -> usize {
        self.state.lock().unwrap().analytics_calls
    }

    fn upstream_error(message: &str) -> FetchError {
        FetchError::Upstream {
            status: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl MetricsFetcher for FakeFetcher {
    async fn channel_snapshot(&self, _channel_id: &str) -> Result<ChannelSnapshot, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.snapshot_calls += 1;
        if state.quota_exhausted {
            return Err(FetchError::QuotaExhausted);
        }
        if let Some(message) = &state.snapshot_failure {
            return Err(Self::upstream_error(message));
        }
        Ok(state.snapshot)
    }

    async fn video_ids(&self, _channel_id: &str) -> Result<Vec<String>, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.listing_calls += 1;
        if state.quota_exhausted {
            return Err(FetchError::QuotaExhausted);
        }
        Ok(state.video_ids.clone())
    }

    async fn video_metrics(&self, video_ids: &[String]) -> Result<Vec<VideoMetric>, FetchError> {
        let state = self.state.lock().unwrap();
        if state.quota_exhausted {
            return Err(FetchError::QuotaExhausted);
        }
        Ok(state
            .videos
            .iter()
            .filter(|v| video_ids.contains(&v.video_id))
            .cloned()
            .collect())
    }

    async fn analytics_window(
        &self,
        _day_offset: i64,
    ) -> Result<Option<AnalyticsWindow>, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.analytics_calls += 1;
        if state.quota_exhausted {
            return Err(FetchError::QuotaExhausted);
        }
        Ok(state.window)
    }

    async fn audience_breakdown(&self) -> Result<AudienceBreakdown, FetchError> {
        let state = self.state.lock().unwrap();
        if state.breakdown_failure {
            return Err(Self::upstream_error("audience unavailable"));
        }
        Ok(state.audience.clone())
    }

    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, FetchError> {
        let state = self.state.lock().unwrap();
        if state.breakdown_failure {
            return Err(Self::upstream_error("traffic unavailable"));
        }
        Ok(state.traffic.clone())
    }
}

/// Records every message. Optionally fails each send after recording it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<(ChatId, String)>>,
    pub failing: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<(ChatId, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
        if self.failing {
            anyhow::bail!("chat unreachable");
        }
        Ok(())
    }
}
