//! Digest generation.
//!
//! The digest compares the current channel state against the baseline captured
//! when the previous digest was sent, and summarises one day of analytics plus
//! the recent audience and traffic mix.

use chrono::NaiveDate;

use crate::format::{delta, signed_delta, thousands};
use crate::model::{
    AnalyticsWindow, AudienceBreakdown, ChannelSnapshot, ReportBaseline, TrafficSource,
    VideoMetric,
};

/// Number of videos listed in the top-videos section.
pub const TOP_VIDEO_COUNT: usize = 2;

/// Traffic source types shown in the digest, with their labels.
const TRAFFIC_ROWS: [(&str, &str); 3] = [
    ("SUGGESTED", "Suggested videos"),
    ("YT_SEARCH", "Search"),
    ("EXT_URL", "External sites"),
];

/// Everything a digest is built from.
#[derive(Debug, Clone, Copy)]
pub struct DigestInputs<'a> {
    pub date: NaiveDate,
    pub snapshot: &'a ChannelSnapshot,
    pub videos: &'a [VideoMetric],
    pub activity: &'a AnalyticsWindow,
    pub baseline: &'a ReportBaseline,
    pub audience: &'a AudienceBreakdown,
    pub traffic: &'a [TrafficSource],
}

/// A formatted digest and the baseline to persist once it is sent.
#[derive(Debug, Clone)]
pub struct Digest {
    pub text: String,
    pub baseline: ReportBaseline,
}

/// Overall direction of the channel since the last digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Growing,
    Stable,
}

impl Trend {
    /// Growing only if subscribers went up and the activity window has views.
    pub fn classify(subscriber_delta: i64, activity_views: u64) -> Self {
        if subscriber_delta > 0 && activity_views > 0 {
            Trend::Growing
        } else {
            Trend::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Growing => "Subscribers and views are growing.",
            Trend::Stable => "Activity is stable.",
        }
    }
}

/// Rank videos by views gained since the baseline and keep the first `count`.
///
/// The sort is stable, so videos with equal gains keep their fetch order.
pub fn top_videos<'a>(
    videos: &'a [VideoMetric],
    baseline: &ReportBaseline,
    count: usize,
) -> Vec<&'a VideoMetric> {
    let mut ranked: Vec<(i64, &VideoMetric)> = videos
        .iter()
        .map(|v| (delta(v.view_count, baseline.video_views(&v.video_id)), v))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().take(count).map(|(_, v)| v).collect()
}

/// Share of total views per source, in percent.
///
/// Every source reports 0 when there were no views at all.
pub fn traffic_percentages(traffic: &[TrafficSource]) -> Vec<(String, f64)> {
    let total: u64 = traffic.iter().map(|t| t.views).sum();
    traffic
        .iter()
        .map(|t| {
            let share = if total > 0 {
                t.views as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            (t.source_type.clone(), share)
        })
        .collect()
}

fn share_of(percentages: &[(String, f64)], source_type: &str) -> f64 {
    percentages
        .iter()
        .find(|(source, _)| source == source_type)
        .map(|(_, share)| *share)
        .unwrap_or(0.0)
}

/// Build the digest text and the baseline that replaces the loaded one.
pub fn build_digest(inputs: &DigestInputs<'_>) -> Digest {
    let DigestInputs {
        date,
        snapshot,
        videos,
        activity,
        baseline,
        audience,
        traffic,
    } = *inputs;

    let subscriber_delta = delta(snapshot.subscriber_count, baseline.subscribers);
    let view_delta = delta(snapshot.total_view_count, baseline.total_views);

    let mut lines = vec![
        "📅 Daily channel report".to_string(),
        format!("Date: {}", date.format("%d %B %Y")),
        String::new(),
        "Core metrics".to_string(),
        format!(
            "▫️ Subscribers: {} ({})",
            thousands(snapshot.subscriber_count),
            signed_delta(subscriber_delta)
        ),
        format!(
            "▫️ Channel views: {} ({})",
            thousands(snapshot.total_view_count),
            signed_delta(view_delta)
        ),
        String::new(),
        "Activity for the day".to_string(),
    ];

    if activity.looks_unprocessed() {
        lines.push("⚠️ Analytics for this day may not be processed by the platform yet.".to_string());
    }
    lines.extend([
        format!("▫️ Views: {}", thousands(activity.views)),
        format!("▫️ Likes: {}", thousands(activity.likes)),
        format!("▫️ Dislikes: {}", thousands(activity.dislikes)),
        format!("▫️ Comments: {}", thousands(activity.comments)),
        format!("▫️ Shares: {}", thousands(activity.shares)),
        format!(
            "▫️ Watch time: {} min",
            thousands(activity.estimated_minutes_watched)
        ),
        format!(
            "▫️ Average view duration: {:.2} s",
            activity.average_view_duration
        ),
        format!("▫️ Subscribers gained: {}", activity.subscribers_gained),
        String::new(),
        "Top videos".to_string(),
    ]);

    for (rank, video) in top_videos(videos, baseline, TOP_VIDEO_COUNT)
        .into_iter()
        .enumerate()
    {
        lines.extend([
            format!("{}. «{}»", rank + 1, video.title),
            format!("   - Total views: {}", thousands(video.view_count)),
            format!("   - Likes: {}", thousands(video.like_count)),
            format!("   - Dislikes: {}", thousands(video.dislike_count)),
            format!("   - Comments: {}", thousands(video.comment_count)),
        ]);
    }

    lines.extend([
        String::new(),
        "Audience".to_string(),
        "▫️ Gender:".to_string(),
        format!(
            "   - Male: {:.1}%",
            audience.get("male").copied().unwrap_or(0.0)
        ),
        format!(
            "   - Female: {:.1}%",
            audience.get("female").copied().unwrap_or(0.0)
        ),
        String::new(),
        "Traffic sources".to_string(),
    ]);

    let percentages = traffic_percentages(traffic);
    for (source_type, label) in TRAFFIC_ROWS {
        lines.push(format!(
            "▫️ {}: {:.1}%",
            label,
            share_of(&percentages, source_type)
        ));
    }

    let trend = Trend::classify(subscriber_delta, activity.views);
    lines.extend([
        String::new(),
        "📊 Overall trend:".to_string(),
        trend.label().to_string(),
    ]);

    let text = lines.join("\n");

    Digest {
        text,
        baseline: ReportBaseline::capture(snapshot, videos),
    }
}
