//! Test infrastructure: MockBotApi and a pre-wired store/poller harness.
//!
//! The mock serves scripted status documents and transcript payloads; the
//! transcript payload goes through the real parser so tests exercise the
//! same normalization path as production.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::clients::recall::parse_transcript;
use crate::clients::ClientError;
use crate::poller::CompletionPoller;
use crate::state::MemoryStore;
use crate::traits::{Attendee, BotApi, MeetingInfo, ScheduledBot, StateStore};
use crate::types::MeetingPlatform;

// ---------------------------------------------------------------------------
// MockBotApi
// ---------------------------------------------------------------------------

pub struct MockBotApi {
    statuses: Mutex<HashMap<String, Value>>,
    transcripts: Mutex<HashMap<String, Value>>,
    pub status_calls: Mutex<Vec<String>>,
}

impl MockBotApi {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            transcripts: Mutex::new(HashMap::new()),
            status_calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn set_status(&self, bot_id: &str, status: Value) {
        self.statuses.lock().await.insert(bot_id.to_string(), status);
    }

    pub async fn set_transcript(&self, bot_id: &str, payload: Value) {
        self.transcripts
            .lock()
            .await
            .insert(bot_id.to_string(), payload);
    }

    pub async fn status_call_count(&self) -> usize {
        self.status_calls.lock().await.len()
    }

    /// A status document reporting a finished recording.
    pub fn recording_status() -> Value {
        json!({
            "recordings": [{
                "id": "rec-1",
                "media_shortcuts": {
                    "video_mixed": {"data": {"download_url": "https://dl.example.com/v.mp4"}}
                }
            }],
            "meeting_url": "https://zoom.us/j/123",
            "start_time": "2026-08-05T10:00:00Z",
            "end_time": "2026-08-05T10:30:00Z",
        })
    }

    /// A status document for a bot that hasn't recorded anything yet.
    pub fn pending_status() -> Value {
        json!({"recordings": []})
    }
}

#[async_trait]
impl BotApi for MockBotApi {
    async fn bot_status(&self, bot_id: &str) -> Result<Value, ClientError> {
        self.status_calls.lock().await.push(bot_id.to_string());
        self.statuses
            .lock()
            .await
            .get(bot_id)
            .cloned()
            .ok_or_else(|| ClientError::from_status(404, "bot not found"))
    }

    async fn bot_transcript(&self, bot_id: &str) -> Result<String, ClientError> {
        let payload = self
            .transcripts
            .lock()
            .await
            .get(bot_id)
            .cloned()
            .ok_or_else(|| ClientError::other("no transcript available for this bot"))?;
        parse_transcript(&payload)
            .ok_or_else(|| ClientError::other("unrecognized transcript format"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct PollerHarness {
    pub store: Arc<MemoryStore>,
    pub bots: Arc<MockBotApi>,
    pub poller: CompletionPoller,
}

pub fn setup_poller() -> PollerHarness {
    let store = Arc::new(MemoryStore::new());
    let bots = Arc::new(MockBotApi::new());
    let poller = CompletionPoller::new(
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::clone(&bots) as Arc<dyn BotApi>,
        Duration::from_secs(120),
        Duration::from_secs(60),
    );
    PollerHarness {
        store,
        bots,
        poller,
    }
}

/// A scheduled-bot record for an hour-from-now Zoom meeting.
pub fn sample_scheduled_bot(bot_id: &str) -> ScheduledBot {
    let start_time = Utc::now() + chrono::Duration::hours(1);
    ScheduledBot {
        bot_id: bot_id.to_string(),
        meeting_info: MeetingInfo {
            meeting_url: "https://zoom.us/j/123".to_string(),
            start_time,
            duration_minutes: 30,
            platform: MeetingPlatform::Zoom,
            title: "Quarterly Review".to_string(),
            attendees: vec![Attendee {
                email: Some("ada@example.com".to_string()),
                name: Some("Ada".to_string()),
                response_status: "accepted".to_string(),
            }],
        },
        scheduled_for: start_time - chrono::Duration::minutes(5),
        status: "scheduled".to_string(),
        completed: None,
    }
}
