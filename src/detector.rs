//! Change detection between consecutive ticks.
//!
//! [`detect_changes`] is a pure comparison. [`LastSeen`] holds the counters the
//! poll loop compares against and applies the replacement rules after each
//! comparison.

use std::collections::HashMap;

use crate::model::{ChangeEvent, ChannelSnapshot, VideoMetric};

/// Compare fresh metrics against the previous observation.
///
/// - A `SubscriberIncrease` is emitted only when the count strictly increased.
/// - A `ViewIncrease` is emitted for each video present in both mappings whose
///   view count strictly increased. Videos seen for the first time emit nothing.
///
/// The subscriber event, if any, comes first; video events follow the order of
/// `current_videos`.
pub fn detect_changes(
    previous_subscribers: u64,
    current: &ChannelSnapshot,
    previous_videos: &[VideoMetric],
    current_videos: &[VideoMetric],
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    if current.subscriber_count > previous_subscribers {
        events.push(ChangeEvent::SubscriberIncrease {
            delta: current.subscriber_count - previous_subscribers,
            new_total: current.subscriber_count,
        });
    }

    let previous_views: HashMap<&str, u64> = previous_videos
        .iter()
        .map(|v| (v.video_id.as_str(), v.view_count))
        .collect();

    for video in current_videos {
        let Some(&before) = previous_views.get(video.video_id.as_str()) else {
            continue;
        };
        if video.view_count > before {
            events.push(ChangeEvent::ViewIncrease {
                video_id: video.video_id.clone(),
                title: video.title.clone(),
                delta: video.view_count - before,
                new_total: video.view_count,
            });
        }
    }

    events
}

/// The "last seen" counters owned by the poll loop.
#[derive(Debug, Clone, Default)]
pub struct LastSeen {
    subscribers: Option<u64>,
    videos: Vec<VideoMetric>,
}

impl LastSeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a first observation has been recorded.
    pub fn is_seeded(&self) -> bool {
        self.subscribers.is_some()
    }

    pub fn subscribers(&self) -> Option<u64> {
        self.subscribers
    }

    pub fn videos(&self) -> &[VideoMetric] {
        &self.videos
    }

    /// Forget everything; the next observation only seeds.
    pub fn reset(&mut self) {
        self.subscribers = None;
        self.videos.clear();
    }

    /// Compare against the stored counters, then adopt the new observation.
    ///
    /// The video mapping is always replaced wholesale. The subscriber count only
    /// moves up, so a loss followed by a regain is not announced twice. The
    /// first observation seeds the counters and emits nothing.
    pub fn observe(
        &mut self,
        snapshot: &ChannelSnapshot,
        videos: Vec<VideoMetric>,
    ) -> Vec<ChangeEvent> {
        let previous = self.subscribers.unwrap_or(snapshot.subscriber_count);
        let events = detect_changes(previous, snapshot, &self.videos, &videos);

        self.subscribers = Some(previous.max(snapshot.subscriber_count));
        self.videos = videos;

        events
    }
}
