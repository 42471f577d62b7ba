//! Durable store for the report baseline.
//!
//! The baseline is loaded whole at the start of a digest build and replaced
//! whole once the digest has been sent. There are no partial updates.

use chrono::Utc;

use crate::model::ReportBaseline;
use crate::storage::Storage;

const REPORT_BASELINE_RECORD: &str = "report_baseline";

/// Repository for the single [`ReportBaseline`] record.
#[derive(Clone)]
pub struct ReportBaselineStore {
    storage: Storage,
}

impl ReportBaselineStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Load the baseline, or an all-zero baseline if none was saved yet.
    pub async fn load(&self) -> anyhow::Result<ReportBaseline> {
        match self.storage.get_record(REPORT_BASELINE_RECORD).await? {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(ReportBaseline::default()),
        }
    }

    /// Replace the stored baseline.
    pub async fn save(&self, baseline: &ReportBaseline) -> anyhow::Result<()> {
        let body = serde_json::to_string(baseline)?;
        self.storage
            .put_record(REPORT_BASELINE_RECORD, &body, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VideoCounters;

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let store = ReportBaselineStore::new(storage);

        let baseline = store.load().await.unwrap();

        assert_eq!(baseline.subscribers, 0);
        assert_eq!(baseline.total_views, 0);
        assert!(baseline.video_stats.is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_whole_record() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let store = ReportBaselineStore::new(storage);

        let mut first = ReportBaseline {
            subscribers: 100,
            total_views: 1000,
            ..Default::default()
        };
        first.video_stats.insert(
            "old".to_string(),
            VideoCounters {
                view_count: 5,
                ..Default::default()
            },
        );
        store.save(&first).await.unwrap();

        let second = ReportBaseline {
            subscribers: 105,
            total_views: 1050,
            ..Default::default()
        };
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, second);
        assert!(!loaded.video_stats.contains_key("old"));
    }

    #[tokio::test]
    async fn test_partial_record_fills_defaults() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        storage
            .put_record(REPORT_BASELINE_RECORD, r#"{"subscribers": 7}"#, Utc::now())
            .await
            .unwrap();

        let baseline = ReportBaselineStore::new(storage).load().await.unwrap();

        assert_eq!(baseline.subscribers, 7);
        assert_eq!(baseline.total_views, 0);
    }
}
