use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::ClientError;
use crate::types::MeetingPlatform;

/// A connected Google account with its OAuth credential.
///
/// Created or overwritten on each OAuth callback; removed on disconnect.
/// Token expiry is not enforced here — an expired access token surfaces as
/// an auth error on the next calendar call and is refreshed at that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// One attendee of a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: Option<String>,
    pub name: Option<String>,
    pub response_status: String,
}

/// A calendar event as reported by the calendar API, normalized to the
/// fields the rest of the system consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub google_event_id: Option<String>,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub attendees: Vec<Attendee>,
    pub meeting_url: Option<String>,
    pub creator: Option<String>,
    pub organizer: Option<String>,
    pub status: Option<String>,
    pub html_link: Option<String>,
}

/// Meeting metadata extracted from a calendar event when dispatching a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub meeting_url: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub platform: MeetingPlatform,
    pub title: String,
    pub attendees: Vec<Attendee>,
}

/// A bot dispatched for a calendar event. At most one exists per event id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBot {
    pub bot_id: String,
    pub meeting_info: MeetingInfo,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletedBot>,
}

/// What the poller learned about a bot that finished recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedBot {
    pub bot_id: String,
    pub recording: Value,
    pub meeting_url: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub media_url: Option<String>,
    pub transcript: String,
}

/// A finished meeting with its transcript. Written exactly once per event
/// id when the poller correlates a completed bot back to its event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMeeting {
    pub meeting_id: String,
    pub bot_id: String,
    pub transcript: String,
    pub media_url: String,
    pub status: String,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub attendees: Vec<Attendee>,
    pub platform: MeetingPlatform,
    pub meeting_url: String,
    pub title: String,
}

/// Flat user settings object. Field names follow the frontend's JSON keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub recall_join_before_minutes: i64,
    pub enable_notifications: bool,
    pub auto_generate_content: bool,
    pub default_platform: String,
    pub linkedin_prompt: String,
    pub facebook_prompt: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            recall_join_before_minutes: 5,
            enable_notifications: true,
            auto_generate_content: true,
            default_platform: "zoom".to_string(),
            linkedin_prompt: "Draft a LinkedIn post (120-180 words) that summarizes the \
                meeting value in first person. Use a warm, conversational tone consistent \
                with an experienced financial advisor. End with up to three hashtags. \
                Return only the post text."
                .to_string(),
            facebook_prompt: "Write a Facebook post (100-150 words) that summarizes the \
                meeting value in first person. Use a friendly, conversational tone that's \
                engaging for Facebook. Include 2-3 relevant hashtags at the end. Make it \
                shareable and engaging for Facebook audience. Return only the post text."
                .to_string(),
        }
    }
}

/// Partial settings update. Unknown keys in the request body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub recall_join_before_minutes: Option<i64>,
    pub enable_notifications: Option<bool>,
    pub auto_generate_content: Option<bool>,
    pub default_platform: Option<String>,
    pub linkedin_prompt: Option<String>,
    pub facebook_prompt: Option<String>,
}

/// Storage abstraction over all registries.
///
/// The in-memory implementation is the only one today; routing every access
/// through this trait keeps the maps behind one lock and leaves room for a
/// real datastore without touching call sites.
#[async_trait]
pub trait StateStore: Send + Sync {
    // Connected Google accounts
    async fn upsert_account(&self, account: GoogleAccount) -> anyhow::Result<()>;
    async fn get_account(&self, account_id: &str) -> anyhow::Result<Option<GoogleAccount>>;
    async fn list_accounts(&self) -> anyhow::Result<Vec<GoogleAccount>>;
    async fn remove_account(&self, account_id: &str) -> anyhow::Result<bool>;

    // Per-event notetaker flags
    async fn notetaker_enabled(&self, event_id: &str) -> anyhow::Result<bool>;
    async fn set_notetaker(&self, event_id: &str, enabled: bool) -> anyhow::Result<()>;

    // Scheduled bots
    async fn insert_scheduled_bot(&self, event_id: &str, bot: ScheduledBot) -> anyhow::Result<()>;
    async fn get_scheduled_bot(&self, event_id: &str) -> anyhow::Result<Option<ScheduledBot>>;
    async fn list_scheduled_bots(&self) -> anyhow::Result<Vec<(String, ScheduledBot)>>;
    /// Correlate a bot id back to its event id. With duplicate bot ids the
    /// first match wins; duplicates are not expected to occur.
    async fn find_event_for_bot(&self, bot_id: &str) -> anyhow::Result<Option<String>>;
    async fn mark_bot_completed(&self, event_id: &str, payload: CompletedBot)
        -> anyhow::Result<bool>;

    // Completed meetings
    /// Insert-if-absent. Returns false when a record already exists for the
    /// event id, in which case the existing record is left untouched.
    async fn insert_completed_meeting(&self, meeting: CompletedMeeting) -> anyhow::Result<bool>;
    async fn get_completed_meeting(&self, event_id: &str)
        -> anyhow::Result<Option<CompletedMeeting>>;
    async fn list_completed_meetings(&self) -> anyhow::Result<Vec<CompletedMeeting>>;
    /// Replace a completed meeting's transcript (manual correction). False
    /// when no record exists for the event id.
    async fn set_transcript(&self, event_id: &str, transcript: &str) -> anyhow::Result<bool>;

    // Managed bot set
    async fn add_managed_bot(&self, bot_id: &str) -> anyhow::Result<()>;
    async fn remove_managed_bot(&self, bot_id: &str) -> anyhow::Result<bool>;
    async fn managed_bot_ids(&self) -> anyhow::Result<Vec<String>>;

    // Settings
    async fn settings(&self) -> anyhow::Result<UserSettings>;
    async fn update_settings(&self, patch: SettingsPatch) -> anyhow::Result<UserSettings>;
}

/// The slice of the bot-management API the completion poller depends on.
/// `RecallClient` is the real implementation; tests drive the poller with a
/// scripted mock.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn bot_status(&self, bot_id: &str) -> Result<Value, ClientError>;
    async fn bot_transcript(&self, bot_id: &str) -> Result<String, ClientError>;
}
