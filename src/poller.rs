//! Bot-completion poller.
//!
//! The one recurring process in the system: on a fixed cadence it asks the
//! bot-management API which tracked bots have produced a recording, fetches
//! their transcripts, and promotes them into the completed-meetings
//! registry. The cycle function is public so tests (and the manual poll
//! endpoint) can step it deterministically instead of waiting on the timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clients::ClientError;
use crate::traits::{BotApi, CompletedBot, CompletedMeeting, StateStore};

/// Runtime snapshot of the poller, surfaced on the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollerSnapshot {
    pub cycles: u64,
    pub last_run_at: Option<String>,
    pub last_success_at: Option<String>,
    pub last_error_at: Option<String>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub completed_total: u64,
}

#[derive(Default)]
pub struct PollerTelemetry {
    inner: Mutex<PollerSnapshot>,
}

impl PollerTelemetry {
    fn mark_started(&self) {
        let mut snap = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        snap.cycles += 1;
        snap.last_run_at = Some(Utc::now().to_rfc3339());
    }

    fn mark_success(&self, completed: usize) {
        let mut snap = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        snap.last_success_at = Some(Utc::now().to_rfc3339());
        snap.last_error = None;
        snap.consecutive_failures = 0;
        snap.completed_total += completed as u64;
    }

    fn mark_failure(&self, message: String) {
        let mut snap = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        snap.last_error_at = Some(Utc::now().to_rfc3339());
        snap.last_error = Some(message);
        snap.consecutive_failures += 1;
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// What one status check concluded about a bot.
enum BotPollOutcome {
    /// Still recording (or not yet joined); check again next cycle.
    Pending,
    /// Terminal failure reported by the provider; stop tracking it.
    Failed,
    Completed(Box<CompletedBot>),
}

pub struct CompletionPoller {
    store: Arc<dyn StateStore>,
    bots: Arc<dyn BotApi>,
    interval: Duration,
    error_backoff: Duration,
    telemetry: Arc<PollerTelemetry>,
}

impl CompletionPoller {
    pub fn new(
        store: Arc<dyn StateStore>,
        bots: Arc<dyn BotApi>,
        interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            store,
            bots,
            interval,
            error_backoff,
            telemetry: Arc::new(PollerTelemetry::default()),
        }
    }

    pub fn telemetry(&self) -> Arc<PollerTelemetry> {
        self.telemetry.clone()
    }

    /// Start the poll loop in a spawned task. The loop runs until a message
    /// arrives on (or the sender side of) `stop` — there is no other way to
    /// end it, and a failed cycle only shortens the next sleep.
    pub fn spawn(self: Arc<Self>, mut stop: mpsc::Receiver<()>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "bot completion poller started"
            );
            loop {
                let delay = match self.run_cycle().await {
                    Ok(completed) => {
                        if !completed.is_empty() {
                            info!(count = completed.len(), "processed completed bots");
                        }
                        self.interval
                    }
                    Err(e) => {
                        error!(error = %e, "poll cycle failed, backing off");
                        self.error_backoff
                    }
                };
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop.recv() => {
                        info!("bot completion poller stopped");
                        break;
                    }
                }
            }
        })
    }

    /// One reconcile cycle over the managed set. Per-bot failures are
    /// logged and skipped; only store access errors fail the whole cycle.
    pub async fn run_cycle(&self) -> anyhow::Result<Vec<CompletedBot>> {
        self.telemetry.mark_started();
        let result = self.reconcile().await;
        match &result {
            Ok(completed) => self.telemetry.mark_success(completed.len()),
            Err(e) => self.telemetry.mark_failure(e.to_string()),
        }
        result
    }

    async fn reconcile(&self) -> anyhow::Result<Vec<CompletedBot>> {
        let bot_ids = self.store.managed_bot_ids().await?;
        debug!(managed = bot_ids.len(), "checking managed bots");

        let mut completed = Vec::new();
        for bot_id in bot_ids {
            match self.check_bot(&bot_id).await {
                Ok(BotPollOutcome::Pending) => {}
                Ok(BotPollOutcome::Failed) => {
                    warn!(bot_id = %bot_id, "bot reported terminal failure, dropping");
                    self.store.remove_managed_bot(&bot_id).await?;
                }
                Ok(BotPollOutcome::Completed(bot)) => {
                    self.store.remove_managed_bot(&bot_id).await?;
                    match self.store.find_event_for_bot(&bot_id).await? {
                        Some(event_id) => self.promote(&event_id, &bot).await?,
                        None => {
                            warn!(
                                bot_id = %bot_id,
                                "no scheduled meeting matches completed bot, dropping result"
                            );
                        }
                    }
                    completed.push(*bot);
                }
                Err(e) => {
                    warn!(bot_id = %bot_id, error = %e, "bot poll failed, skipping");
                }
            }
        }
        Ok(completed)
    }

    async fn check_bot(&self, bot_id: &str) -> Result<BotPollOutcome, ClientError> {
        let status = self.bots.bot_status(bot_id).await?;

        let recording = status
            .get("recordings")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .cloned();
        let Some(recording) = recording else {
            if matches!(status["status"].as_str(), Some("failed") | Some("error")) {
                return Ok(BotPollOutcome::Failed);
            }
            return Ok(BotPollOutcome::Pending);
        };

        // A transcript fetch failure does not block completion; the meeting
        // is recorded with an empty transcript.
        let transcript = match self.bots.bot_transcript(bot_id).await {
            Ok(t) => t,
            Err(e) => {
                warn!(bot_id = %bot_id, error = %e, "transcript fetch failed");
                String::new()
            }
        };

        let media_url = recording
            .pointer("/media_shortcuts/video_mixed/data/download_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(BotPollOutcome::Completed(Box::new(CompletedBot {
            bot_id: bot_id.to_string(),
            meeting_url: status["meeting_url"].as_str().map(str::to_string),
            start_time: status["start_time"].as_str().map(str::to_string),
            end_time: status["end_time"].as_str().map(str::to_string),
            media_url,
            recording,
            transcript,
        })))
    }

    /// Write the completed-meeting record (once) and mark the scheduled bot
    /// completed. Attendees, platform, and title carry over from the
    /// metadata captured at scheduling time.
    async fn promote(&self, event_id: &str, bot: &CompletedBot) -> anyhow::Result<()> {
        let Some(scheduled) = self.store.get_scheduled_bot(event_id).await? else {
            warn!(event_id, "scheduled bot disappeared before promotion");
            return Ok(());
        };
        let info = &scheduled.meeting_info;

        let completed_at = parse_time(bot.end_time.as_deref()).unwrap_or_else(Utc::now);
        let duration_secs = match (
            parse_time(bot.start_time.as_deref()),
            parse_time(bot.end_time.as_deref()),
        ) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0),
            _ => 0,
        };

        let meeting = CompletedMeeting {
            meeting_id: event_id.to_string(),
            bot_id: bot.bot_id.clone(),
            transcript: bot.transcript.clone(),
            media_url: bot.media_url.clone().unwrap_or_default(),
            status: "completed".to_string(),
            completed_at,
            duration_secs,
            attendees: info.attendees.clone(),
            platform: info.platform,
            meeting_url: info.meeting_url.clone(),
            title: info.title.clone(),
        };

        let inserted = self.store.insert_completed_meeting(meeting).await?;
        if inserted {
            info!(
                event_id,
                bot_id = %bot.bot_id,
                transcript_chars = bot.transcript.len(),
                "stored completed meeting"
            );
        } else {
            debug!(event_id, "completed meeting already recorded, leaving as is");
        }

        self.store.mark_bot_completed(event_id, bot.clone()).await?;
        Ok(())
    }
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
