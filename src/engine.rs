//! The poll loop.
//!
//! Every tick the engine fetches the channel's current state, announces
//! increases since the previous tick and, at most once per report interval,
//! sends a digest and moves the report baseline forward.
//!
//! ```text
//! Idle -> Fetching -> Detecting -> Notifying -> (Reporting) -> Idle
//!            |
//!            +-- quota exhausted --> Cooldown --(1h)--> Idle
//! ```
//!
//! All mutable state lives in an [`EngineContext`] passed to each tick. The
//! only state shared with the webhook is the chat binding, observed through a
//! `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::baseline::ReportBaselineStore;
use crate::cache::{AnalyticsCache, DAILY_ACTIVITY_KEY};
use crate::data_sources::MetricsFetcher;
use crate::detector::LastSeen;
use crate::error::{CycleError, FetchError};
use crate::model::{AnalyticsWindow, ChannelSnapshot, ChatId};
use crate::report::{DigestInputs, build_digest};
use crate::storage::Storage;
use crate::telegram::NotificationSink;

/// Time between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum time between two digests.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(600);

/// How long polling pauses after the upstream quota is exhausted.
pub const DEFAULT_QUOTA_COOLDOWN: Duration = Duration::from_secs(3600);

/// The daily activity window lags this many days behind today.
pub const ANALYTICS_DAY_OFFSET: i64 = 4;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub channel_id: String,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub quota_cooldown: Duration,
    pub analytics_day_offset: i64,
}

impl EngineConfig {
    pub fn new(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            quota_cooldown: DEFAULT_QUOTA_COOLDOWN,
            analytics_day_offset: ANALYTICS_DAY_OFFSET,
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Detecting,
    Notifying,
    Reporting,
    Cooldown,
}

/// State owned by the poll loop.
#[derive(Debug)]
pub struct EngineContext {
    /// Chat receiving notifications; `None` suspends fetching.
    pub chat: Option<ChatId>,

    /// Counters from the previous successful tick.
    pub last_seen: LastSeen,

    /// Uploads of the channel. Re-listed while empty.
    pub video_ids: Vec<String>,

    /// When the last digest went out.
    pub last_report_at: Option<Instant>,

    pub state: PollState,
}

impl EngineContext {
    pub fn new(chat: Option<ChatId>, video_ids: Vec<String>) -> Self {
        Self {
            chat,
            last_seen: LastSeen::new(),
            video_ids,
            last_report_at: None,
            state: PollState::Idle,
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No chat is bound; nothing was fetched.
    Skipped,

    /// The cycle ran to the end.
    Completed {
        notifications: usize,
        digest_sent: bool,
    },

    /// The cycle was aborted; polling continues at the next tick.
    Failed,

    /// The upstream quota is exhausted; polling should pause.
    Cooldown,
}

/// The poll loop and its collaborators.
pub struct Engine {
    config: EngineConfig,
    fetcher: Arc<dyn MetricsFetcher>,
    notifier: Arc<dyn NotificationSink>,
    cache: AnalyticsCache,
    baselines: ReportBaselineStore,
    binding: watch::Receiver<Option<ChatId>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn MetricsFetcher>,
        notifier: Arc<dyn NotificationSink>,
        storage: Storage,
        binding: watch::Receiver<Option<ChatId>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            notifier,
            cache: AnalyticsCache::new(storage.clone()),
            baselines: ReportBaselineStore::new(storage),
            binding,
        }
    }

    /// Build the starting context, listing the channel's uploads.
    ///
    /// A failed listing is logged and retried on the first tick.
    pub async fn initial_context(&mut self) -> EngineContext {
        let chat = *self.binding.borrow_and_update();
        if chat.is_none() {
            warn!("No chat bound yet; send /start to the bot to enable notifications");
        }

        let video_ids = match self.fetcher.video_ids(&self.config.channel_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list channel videos at startup");
                Vec::new()
            }
        };

        if video_ids.is_empty() {
            warn!("No videos found; the channel may be empty or access is restricted");
        } else {
            info!(video_count = video_ids.len(), "Listed channel videos");
            match self.fetcher.video_metrics(&video_ids).await {
                Ok(videos) => {
                    for video in &videos {
                        info!(video_id = %video.video_id, title = %video.title, "Tracking video");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to fetch video details at startup"),
            }
        }

        EngineContext::new(chat, video_ids)
    }

    /// Tick forever. Only process shutdown stops the loop.
    pub async fn run(mut self, mut ctx: EngineContext) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "Poll loop started"
        );

        loop {
            sleep(self.config.poll_interval).await;

            if self.tick(&mut ctx).await == TickOutcome::Cooldown {
                info!(
                    cooldown_secs = self.config.quota_cooldown.as_secs(),
                    "Polling suspended until the quota recovers"
                );
                sleep(self.config.quota_cooldown).await;
                ctx.state = PollState::Idle;
                info!("Polling resumed after cooldown");
            }
        }
    }

    /// Run one poll cycle.
    pub async fn tick(&mut self, ctx: &mut EngineContext) -> TickOutcome {
        self.sync_binding(ctx);

        let Some(chat_id) = ctx.chat else {
            warn!("No chat bound, skipping poll");
            return TickOutcome::Skipped;
        };

        match self.run_cycle(ctx, chat_id).await {
            Ok(outcome) => {
                ctx.state = PollState::Idle;
                outcome
            }
            Err(e) if e.is_quota_exhausted() => {
                warn!("API quota exhausted, entering cooldown");
                ctx.state = PollState::Cooldown;
                self.notify(
                    chat_id,
                    &format!(
                        "API quota exceeded. Polling paused for {}.",
                        pause_label(self.config.quota_cooldown)
                    ),
                )
                .await;
                TickOutcome::Cooldown
            }
            Err(e) => {
                error!(error = %e, "Poll cycle failed");
                ctx.state = PollState::Idle;
                self.notify(chat_id, &format!("Poll cycle failed: {}", e))
                    .await;
                TickOutcome::Failed
            }
        }
    }

    /// Pick up a new binding from the webhook. A (re)bind re-seeds the counters.
    fn sync_binding(&mut self, ctx: &mut EngineContext) {
        if !self.binding.has_changed().unwrap_or(false) {
            return;
        }

        let chat = *self.binding.borrow_and_update();
        info!(chat_id = ?chat, "Chat binding changed");
        ctx.chat = chat;
        ctx.last_seen.reset();
    }

    async fn run_cycle(
        &self,
        ctx: &mut EngineContext,
        chat_id: ChatId,
    ) -> Result<TickOutcome, CycleError> {
        ctx.state = PollState::Fetching;
        if ctx.video_ids.is_empty() {
            ctx.video_ids = self.fetcher.video_ids(&self.config.channel_id).await?;
        }
        let snapshot = self
            .fetcher
            .channel_snapshot(&self.config.channel_id)
            .await?;
        let videos = self.fetcher.video_metrics(&ctx.video_ids).await?;
        let activity = self.daily_activity().await?;

        ctx.state = PollState::Detecting;
        let events = ctx.last_seen.observe(&snapshot, videos);

        ctx.state = PollState::Notifying;
        for event in &events {
            self.notify(chat_id, &event.message()).await;
            info!(event = ?event, "Change notification sent");
        }

        let now = Instant::now();
        let report_due = ctx
            .last_report_at
            .is_none_or(|at| now.duration_since(at) >= self.config.report_interval);

        if report_due {
            ctx.state = PollState::Reporting;
            self.send_digest(ctx, chat_id, &snapshot, &activity).await?;
            ctx.last_report_at = Some(now);
        }

        Ok(TickOutcome::Completed {
            notifications: events.len(),
            digest_sent: report_due,
        })
    }

    /// The daily activity window, from cache when possible.
    ///
    /// An empty report counts as all zeros and is not cached, so the next tick
    /// asks again.
    async fn daily_activity(&self) -> Result<AnalyticsWindow, FetchError> {
        let now = Utc::now();
        if let Some(window) = self.cache.get(DAILY_ACTIVITY_KEY, now).await {
            debug!("Using cached daily activity");
            return Ok(window);
        }

        match self
            .fetcher
            .analytics_window(self.config.analytics_day_offset)
            .await?
        {
            Some(window) => {
                self.cache.put(DAILY_ACTIVITY_KEY, &window, now).await;
                Ok(window)
            }
            None => Ok(AnalyticsWindow::default()),
        }
    }

    async fn send_digest(
        &self,
        ctx: &EngineContext,
        chat_id: ChatId,
        snapshot: &ChannelSnapshot,
        activity: &AnalyticsWindow,
    ) -> Result<(), CycleError> {
        let baseline = self.baselines.load().await?;
        let audience = or_default(self.fetcher.audience_breakdown().await, "audience")?;
        let traffic = or_default(self.fetcher.traffic_sources().await, "traffic sources")?;

        let digest = build_digest(&DigestInputs {
            date: Utc::now().date_naive(),
            snapshot,
            videos: ctx.last_seen.videos(),
            activity,
            baseline: &baseline,
            audience: &audience,
            traffic: &traffic,
        });

        self.notify(chat_id, &digest.text).await;
        info!("Digest sent");

        if let Err(e) = self.baselines.save(&digest.baseline).await {
            warn!(error = %e, "Failed to persist report baseline");
        }

        Ok(())
    }

    /// Best-effort delivery; failures are logged only.
    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.notifier.send(chat_id, text).await {
            warn!(chat_id, error = %e, "Failed to deliver notification");
        }
    }
}

/// Whole minutes, or a smaller unit for pauses shorter than a minute.
fn pause_label(pause: Duration) -> String {
    let secs = pause.as_secs();
    match secs {
        0 => format!("{} ms", pause.as_millis()),
        1 => "1 second".to_string(),
        0..60 => format!("{} seconds", secs),
        60..120 => "1 minute".to_string(),
        _ => format!("{} minutes", secs / 60),
    }
}

/// Breakdowns are decoration: fall back to empty data unless the quota is gone.
fn or_default<T: Default>(result: Result<T, FetchError>, what: &str) -> Result<T, FetchError> {
    match result {
        Ok(value) => Ok(value),
        Err(FetchError::QuotaExhausted) => Err(FetchError::QuotaExhausted),
        Err(e) => {
            warn!(what, error = %e, "Breakdown unavailable, reporting zeros");
            Ok(T::default())
        }
    }
}
