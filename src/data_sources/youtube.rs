//! YouTube Data API v3 client.
//!
//! Reads public channel statistics, the channel's uploads listing and per-video
//! statistics.
//!
//! # API Reference
//!
//! See: <https://developers.google.com/youtube/v3/docs>

use serde::Deserialize;
use tracing::info;

use crate::data_sources::google::GoogleApi;
use crate::error::FetchError;
use crate::model::{ChannelSnapshot, VideoMetric};

/// Base URL for the Data API.
const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum ids per `videos.list` call and items per `playlistItems.list` page.
pub const MAX_BATCH: usize = 50;

/// Client for the YouTube Data API.
#[derive(Clone)]
pub struct YouTubeDataClient {
    api: GoogleApi,
    base_url: String,
}

impl YouTubeDataClient {
    pub fn new(api: GoogleApi) -> Self {
        Self::with_base_url(api, YOUTUBE_API_BASE)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(api: GoogleApi, base_url: &str) -> Self {
        Self {
            api,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch subscriber, view and video counts for a channel.
    pub async fn channel_statistics(&self, channel_id: &str) -> Result<ChannelSnapshot, FetchError> {
        let url = format!(
            "{}/channels?part=statistics&id={}",
            self.base_url,
            urlencoding::encode(channel_id)
        );

        let response: ChannelListResponse = self.api.get_json(&url).await?;
        response.snapshot(channel_id)
    }

    /// Fetch the id of the playlist holding every upload of a channel.
    pub async fn uploads_playlist_id(&self, channel_id: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/channels?part=contentDetails&id={}",
            self.base_url,
            urlencoding::encode(channel_id)
        );

        let response: ChannelListResponse = self.api.get_json(&url).await?;
        response.uploads_playlist(channel_id)
    }

    /// List every video id in a playlist, following page tokens.
    pub async fn playlist_video_ids(&self, playlist_id: &str) -> Result<Vec<String>, FetchError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/playlistItems?part=contentDetails&maxResults={}&playlistId={}",
                self.base_url,
                MAX_BATCH,
                urlencoding::encode(playlist_id)
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: PlaylistItemsResponse = self.api.get_json(&url).await?;
            ids.extend(page.items.into_iter().map(|i| i.content_details.video_id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(playlist_id, video_count = ids.len(), "Listed playlist videos");
        Ok(ids)
    }

    /// Fetch statistics for the given videos, in batches of [`MAX_BATCH`].
    ///
    /// Short-form videos are dropped. The result keeps the order in which the
    /// API returned the items.
    pub async fn video_metrics(&self, video_ids: &[String]) -> Result<Vec<VideoMetric>, FetchError> {
        let mut metrics = Vec::new();

        for chunk in video_ids.chunks(MAX_BATCH) {
            let ids = chunk.join(",");
            let url = format!(
                "{}/videos?part=statistics,contentDetails,snippet&id={}",
                self.base_url,
                urlencoding::encode(&ids)
            );

            let response: VideoListResponse = self.api.get_json(&url).await?;
            metrics.extend(response.tracked_metrics());
        }

        info!(video_count = metrics.len(), "Fetched video statistics");
        Ok(metrics)
    }
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` or `P1DT30M` into seconds.
///
/// Returns `None` for anything that is not a day/time duration.
pub fn parse_iso8601_duration(value: &str) -> Option<f64> {
    let rest = value.strip_prefix('P')?;
    let mut total = 0.0;
    let mut number = String::new();
    let mut in_time = false;

    for ch in rest.chars() {
        match ch {
            'T' if number.is_empty() => in_time = true,
            c if c.is_ascii_digit() || c == '.' => number.push(c),
            unit => {
                let n: f64 = number.parse().ok()?;
                number.clear();
                total += match (in_time, unit) {
                    (false, 'W') => n * 604_800.0,
                    (false, 'D') => n * 86_400.0,
                    (true, 'H') => n * 3_600.0,
                    (true, 'M') => n * 60.0,
                    (true, 'S') => n,
                    _ => return None,
                };
            }
        }
    }

    if number.is_empty() { Some(total) } else { None }
}

/// The Data API encodes counters as decimal strings.
fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

// ============================================================================
// Response types
// ============================================================================

/// Response from `channels.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

impl ChannelListResponse {
    fn first(&self, channel_id: &str) -> Result<&ChannelItem, FetchError> {
        self.items
            .first()
            .ok_or_else(|| FetchError::Malformed(format!("channel {} not found", channel_id)))
    }

    pub fn snapshot(&self, channel_id: &str) -> Result<ChannelSnapshot, FetchError> {
        let stats = self.first(channel_id)?.statistics.as_ref().ok_or_else(|| {
            FetchError::Malformed(format!("channel {} has no statistics", channel_id))
        })?;

        Ok(ChannelSnapshot {
            subscriber_count: parse_count(stats.subscriber_count.as_deref()),
            total_view_count: parse_count(stats.view_count.as_deref()),
            video_count: parse_count(stats.video_count.as_deref()),
        })
    }

    pub fn uploads_playlist(&self, channel_id: &str) -> Result<String, FetchError> {
        self.first(channel_id)?
            .content_details
            .as_ref()
            .and_then(|d| d.related_playlists.uploads.clone())
            .ok_or_else(|| {
                FetchError::Malformed(format!("channel {} has no uploads playlist", channel_id))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelItem {
    #[serde(default)]
    pub id: String,

    pub statistics: Option<ChannelStatistics>,

    #[serde(rename = "contentDetails")]
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,

    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,

    #[serde(rename = "videoCount")]
    pub video_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists", default)]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

/// Response from `playlistItems.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,

    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemContent {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

/// Response from `videos.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

impl VideoListResponse {
    /// Convert to metrics, keeping only long-form videos.
    pub fn tracked_metrics(self) -> impl Iterator<Item = VideoMetric> {
        self.items
            .into_iter()
            .filter_map(VideoItem::into_metric)
            .filter(VideoMetric::is_tracked)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoItem {
    pub id: String,

    #[serde(default)]
    pub snippet: VideoSnippet,

    #[serde(default)]
    pub statistics: VideoStatistics,

    #[serde(rename = "contentDetails")]
    pub content_details: Option<VideoContentDetails>,
}

impl VideoItem {
    /// Items without a parsable duration cannot be classified and are skipped.
    fn into_metric(self) -> Option<VideoMetric> {
        let duration_seconds = self
            .content_details
            .as_ref()
            .and_then(|d| parse_iso8601_duration(&d.duration))?;

        Some(VideoMetric {
            video_id: self.id,
            title: self.snippet.title,
            view_count: parse_count(self.statistics.view_count.as_deref()),
            like_count: parse_count(self.statistics.like_count.as_deref()),
            dislike_count: parse_count(self.statistics.dislike_count.as_deref()),
            comment_count: parse_count(self.statistics.comment_count.as_deref()),
            duration_seconds,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,

    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,

    #[serde(rename = "dislikeCount")]
    pub dislike_count: Option<String>,

    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoContentDetails {
    #[serde(default)]
    pub duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45.0));
        assert_eq!(parse_iso8601_duration("PT5M21S"), Some(321.0));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723.0));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86401.0));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0.0));
        assert_eq!(parse_iso8601_duration("1H"), None);
        assert_eq!(parse_iso8601_duration("PT5X"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
    }

    #[test]
    fn test_channel_snapshot_from_response() {
        let response: ChannelListResponse = serde_json::from_str(
            r#"{
                "items": [{
                    "id": "UC123",
                    "statistics": {
                        "viewCount": "1050",
                        "subscriberCount": "105",
                        "hiddenSubscriberCount": false,
                        "videoCount": "3"
                    }
                }]
            }"#,
        )
        .unwrap();

        let snapshot = response.snapshot("UC123").unwrap();
        assert_eq!(snapshot.subscriber_count, 105);
        assert_eq!(snapshot.total_view_count, 1050);
        assert_eq!(snapshot.video_count, 3);
    }

    #[test]
    fn test_unknown_channel_is_malformed() {
        let response: ChannelListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(matches!(
            response.snapshot("UCnope"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_uploads_playlist() {
        let response: ChannelListResponse = serde_json::from_str(
            r#"{"items": [{"id": "UC1", "contentDetails": {"relatedPlaylists": {"uploads": "UU1"}}}]}"#,
        )
        .unwrap();
        assert_eq!(response.uploads_playlist("UC1").unwrap(), "UU1");
    }

    #[test]
    fn test_video_metrics_skip_shorts() {
        let response: VideoListResponse = serde_json::from_str(
            r#"{
                "items": [
                    {
                        "id": "long",
                        "snippet": {"title": "Deep dive"},
                        "statistics": {"viewCount": "900", "likeCount": "40", "commentCount": "7"},
                        "contentDetails": {"duration": "PT12M5S"}
                    },
                    {
                        "id": "short",
                        "snippet": {"title": "Quick clip"},
                        "statistics": {"viewCount": "5000"},
                        "contentDetails": {"duration": "PT58S"}
                    },
                    {
                        "id": "live",
                        "snippet": {"title": "Upcoming"},
                        "statistics": {},
                        "contentDetails": {"duration": "P0D"}
                    }
                ]
            }"#,
        )
        .unwrap();

        let metrics: Vec<VideoMetric> = response.tracked_metrics().collect();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].video_id, "long");
        assert_eq!(metrics[0].title, "Deep dive");
        assert_eq!(metrics[0].view_count, 900);
        assert_eq!(metrics[0].like_count, 40);
        assert_eq!(metrics[0].dislike_count, 0);
        assert_eq!(metrics[0].comment_count, 7);
        assert_eq!(metrics[0].duration_seconds, 725.0);
    }

    #[test]
    fn test_playlist_page() {
        let page: PlaylistItemsResponse = serde_json::from_str(
            r#"{
                "nextPageToken": "CDIQAA",
                "items": [
                    {"contentDetails": {"videoId": "a"}},
                    {"contentDetails": {"videoId": "b"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("CDIQAA"));
        assert_eq!(page.items[1].content_details.video_id, "b");
    }
}
