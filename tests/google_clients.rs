//! YouTube Data and Analytics clients against a local stand-in for the Google
//! endpoints, covering token exchange, batching and error mapping over HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use channel_pulse::auth::{StoredCredentials, TokenProvider};
use channel_pulse::data_sources::{GoogleApi, YouTubeAnalyticsClient, YouTubeDataClient};
use channel_pulse::error::FetchError;

/// Requests seen by the stand-in server.
#[derive(Clone, Default)]
struct Upstream {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    authorizations: Arc<Mutex<Vec<String>>>,
}

async fn token() -> Json<Value> {
    Json(json!({ "access_token": "test-token", "expires_in": 3600, "token_type": "Bearer" }))
}

/// Every tenth id is a short clip.
async fn videos(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let ids: Vec<String> = params
        .get("id")
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        upstream.authorizations.lock().unwrap().push(auth.to_string());
    }
    upstream.batches.lock().unwrap().push(ids.clone());

    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            let index: usize = id.trim_start_matches('v').parse().unwrap_or(0);
            let duration = if index % 10 == 0 { "PT45S" } else { "PT12M3S" };
            json!({
                "id": id,
                "snippet": { "title": format!("Video {}", id) },
                "statistics": { "viewCount": "10", "likeCount": "2", "commentCount": "1" },
                "contentDetails": { "duration": duration }
            })
        })
        .collect();

    Json(json!({ "kind": "youtube#videoListResponse", "items": items }))
}

async fn channels_over_quota() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{ "domain": "youtube.quota", "reason": "quotaExceeded" }]
            }
        })),
    )
}

async fn empty_report() -> Json<Value> {
    Json(json!({ "kind": "youtubeAnalytics#resultTable", "columnHeaders": [] }))
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/token", post(token))
        .route("/videos", get(videos))
        .route("/channels", get(channels_over_quota))
        .route("/reports", get(empty_report))
        .with_state(upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn google_api(base_url: &str) -> GoogleApi {
    let credentials = StoredCredentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
        token_uri: format!("{}/token", base_url),
    };
    GoogleApi::new(Arc::new(TokenProvider::new(credentials)))
}

#[tokio::test]
async fn test_video_metrics_are_fetched_in_batches_of_fifty() {
    let upstream = Upstream::default();
    let base_url = spawn_upstream(upstream.clone()).await;
    let client = YouTubeDataClient::with_base_url(google_api(&base_url), &base_url);
    let ids: Vec<String> = (0..120).map(|i| format!("v{}", i)).collect();

    let metrics = client.video_metrics(&ids).await.unwrap();

    let batches = upstream.batches.lock().unwrap().clone();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(batches[0][0], "v0");
    assert_eq!(batches[2][19], "v119");

    assert_eq!(metrics.len(), 108);
    assert_eq!(metrics[0].video_id, "v1");
    assert_eq!(metrics[0].view_count, 10);
    assert_eq!(metrics[0].duration_seconds, 723.0);

    let authorizations = upstream.authorizations.lock().unwrap().clone();
    assert_eq!(authorizations.len(), 3);
    assert!(authorizations.iter().all(|a| a == "Bearer test-token"));
}

#[tokio::test]
async fn test_quota_response_is_quota_exhausted() {
    let base_url = spawn_upstream(Upstream::default()).await;
    let client = YouTubeDataClient::with_base_url(google_api(&base_url), &base_url);

    let result = client.channel_statistics("UC123").await;

    assert!(matches!(result, Err(FetchError::QuotaExhausted)));
}

#[tokio::test]
async fn test_empty_analytics_report_is_none() {
    let base_url = spawn_upstream(Upstream::default()).await;
    let client = YouTubeAnalyticsClient::with_base_url(google_api(&base_url), &base_url);
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let window = client.daily_activity(day).await.unwrap();

    assert_eq!(window, None);
}

#[tokio::test]
async fn test_failed_token_exchange_is_auth_error() {
    let base_url = spawn_upstream(Upstream::default()).await;
    let credentials = StoredCredentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
        token_uri: format!("{}/no-such-endpoint", base_url),
    };
    let api = GoogleApi::new(Arc::new(TokenProvider::new(credentials)));
    let client = YouTubeDataClient::with_base_url(api, &base_url);

    let result = client.video_metrics(&["v1".to_string()]).await;

    assert!(matches!(result, Err(FetchError::Auth(_))));
}
