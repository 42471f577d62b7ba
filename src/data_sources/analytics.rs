//! YouTube Analytics API v2 client.
//!
//! Private, owner-only reports: daily activity, audience gender split and
//! traffic source breakdown. All queries use `ids=channel==MINE`, so the
//! channel is whichever one the OAuth credentials belong to.
//!
//! # API Reference
//!
//! See: <https://developers.google.com/youtube/analytics/reference/reports/query>

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::data_sources::google::GoogleApi;
use crate::error::FetchError;
use crate::model::{AnalyticsWindow, AudienceBreakdown, TrafficSource};

/// Base URL for the Analytics API.
const ANALYTICS_API_BASE: &str = "https://youtubeanalytics.googleapis.com/v2";

/// Metrics of the daily activity report, in row order after the `day` column.
const DAILY_METRICS: &str = "views,likes,dislikes,comments,shares,estimatedMinutesWatched,averageViewDuration,subscribersGained";

/// Client for the YouTube Analytics API.
#[derive(Clone)]
pub struct YouTubeAnalyticsClient {
    api: GoogleApi,
    base_url: String,
}

impl YouTubeAnalyticsClient {
    pub fn new(api: GoogleApi) -> Self {
        Self::with_base_url(api, ANALYTICS_API_BASE)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(api: GoogleApi, base_url: &str) -> Self {
        Self {
            api,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn query(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        metrics: &str,
        dimensions: &str,
    ) -> Result<ReportResponse, FetchError> {
        let url = format!(
            "{}/reports?ids=channel%3D%3DMINE&startDate={}&endDate={}&metrics={}&dimensions={}",
            self.base_url,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            urlencoding::encode(metrics),
            urlencoding::encode(dimensions)
        );

        self.api.get_json(&url).await
    }

    /// Activity for a single day, or `None` if the report has no row yet.
    pub async fn daily_activity(&self, day: NaiveDate) -> Result<Option<AnalyticsWindow>, FetchError> {
        let report = self.query(day, day, DAILY_METRICS, "day").await?;
        let window = report.daily_window()?;
        if window.is_none() {
            warn!(day = %day, "Analytics report has no rows for the requested day");
        }
        Ok(window)
    }

    /// Viewer percentage by gender between `start` and `end`.
    pub async fn audience_gender(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AudienceBreakdown, FetchError> {
        let report = self.query(start, end, "viewerPercentage", "gender").await?;
        Ok(report.gender_breakdown())
    }

    /// Views per traffic source type between `start` and `end`.
    pub async fn traffic_sources(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrafficSource>, FetchError> {
        let report = self
            .query(start, end, "views", "insightTrafficSourceType")
            .await?;
        Ok(report.traffic_sources())
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Response from `reports.query`: a table of dimension and metric columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

fn as_count(value: Option<&Value>) -> u64 {
    value
        .and_then(Value::as_f64)
        .map(|v| v.max(0.0).round() as u64)
        .unwrap_or(0)
}

impl ReportResponse {
    /// The first row of a `day`-dimension daily activity report.
    pub fn daily_window(&self) -> Result<Option<AnalyticsWindow>, FetchError> {
        let Some(row) = self.rows.first() else {
            return Ok(None);
        };
        if row.len() < 9 {
            return Err(FetchError::Malformed(format!(
                "daily activity row has {} columns, expected 9",
                row.len()
            )));
        }

        debug!(row = ?row, "Daily activity row");
        Ok(Some(AnalyticsWindow {
            views: as_count(row.get(1)),
            likes: as_count(row.get(2)),
            dislikes: as_count(row.get(3)),
            comments: as_count(row.get(4)),
            shares: as_count(row.get(5)),
            estimated_minutes_watched: as_count(row.get(6)),
            average_view_duration: row.get(7).and_then(Value::as_f64).unwrap_or(0.0),
            subscribers_gained: as_count(row.get(8)),
        }))
    }

    /// `[gender, percentage]` rows. `male` and `female` are always present.
    pub fn gender_breakdown(&self) -> AudienceBreakdown {
        let mut genders = AudienceBreakdown::new();
        genders.insert("male".to_string(), 0.0);
        genders.insert("female".to_string(), 0.0);

        for row in &self.rows {
            if let (Some(gender), Some(percentage)) = (
                row.first().and_then(Value::as_str),
                row.get(1).and_then(Value::as_f64),
            ) {
                genders.insert(gender.to_string(), percentage);
            }
        }

        genders
    }

    /// `[sourceType, views]` rows in report order.
    pub fn traffic_sources(&self) -> Vec<TrafficSource> {
        self.rows
            .iter()
            .filter_map(|row| {
                let source_type = row.first().and_then(Value::as_str)?;
                Some(TrafficSource {
                    source_type: source_type.to_string(),
                    views: as_count(row.get(1)),
                })
            })
            .collect()
    }
}
