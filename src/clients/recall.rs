//! Recall bot-management API client.
//!
//! Creates recording bots for upcoming meetings, reads bot status, and
//! downloads/normalizes transcripts. Which bots are currently tracked lives
//! in the state store's managed set, not here — the client is stateless.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::clients::{ClientError, REQUEST_TIMEOUT};
use crate::config::RecallConfig;
use crate::traits::{BotApi, CalendarEvent, MeetingInfo, ScheduledBot};
use crate::types::{MeetingPlatform, MEETING_URL_HOSTS};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("url pattern is valid"));

pub struct RecallClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RecallClient {
    pub fn new(config: &RecallConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }

    /// Dispatch a bot to a meeting. Returns `Ok(None)` when the join time is
    /// already in the past — too late for a bot to attend.
    pub async fn create_bot(
        &self,
        meeting_url: &str,
        start_time: DateTime<Utc>,
        join_before_minutes: i64,
    ) -> Result<Option<Value>, ClientError> {
        let join_at = start_time - Duration::minutes(join_before_minutes);
        if join_at <= Utc::now() {
            warn!(
                meeting_url,
                start_time = %start_time,
                "meeting starts too soon, skipping bot creation"
            );
            return Ok(None);
        }

        let payload = json!({
            "bot_name": format!("Recap Bot - {}", start_time.format("%Y-%m-%d %H:%M")),
            "meeting_url": meeting_url,
            "join_at": join_at.to_rfc3339(),
            "recording_config": {
                "transcript": {
                    "provider": {
                        "meeting_captions": {}
                    }
                }
            }
        });

        let resp = self
            .http
            .post(format!("{}/bot", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.as_u16() != 201 {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed bot response: {}", e)))?;
        info!(
            bot_id = data["id"].as_str().unwrap_or("unknown"),
            meeting_url,
            join_at = %join_at,
            "created recording bot"
        );
        Ok(Some(data))
    }

    pub async fn bot_status(&self, bot_id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("{}/bot/{}", self.base_url, bot_id))
            .await
    }

    /// Media files recorded by a finished bot.
    pub async fn bot_media(&self, bot_id: &str) -> Result<Value, ClientError> {
        self.get_json(&format!("{}/bot/{}/media", self.base_url, bot_id))
            .await
    }

    /// Fetch and normalize a finished bot's transcript: follow the download
    /// link on the first recording, then flatten either payload shape into
    /// one "Speaker: text" string.
    pub async fn bot_transcript(&self, bot_id: &str) -> Result<String, ClientError> {
        let bot = self.bot_status(bot_id).await?;
        let url = transcript_download_url(&bot)
            .ok_or_else(|| ClientError::other("no transcript available for this bot"))?;

        // The download link is pre-signed; no auth header.
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed transcript payload: {}", e)))?;
        parse_transcript(&payload)
            .ok_or_else(|| ClientError::other("unrecognized transcript format"))
    }

    /// Dispatch a bot for a calendar event. Returns `Ok(None)` when the
    /// event is not eligible: no meeting URL, notetaker disabled, or the
    /// meeting already started.
    pub async fn schedule_bot_for_event(
        &self,
        event: &CalendarEvent,
        notetaker_enabled: bool,
        join_before_minutes: i64,
    ) -> Result<Option<ScheduledBot>, ClientError> {
        let Some(info) = extract_meeting_info(event) else {
            warn!(title = %event.title, "no meeting URL found in event, not scheduling a bot");
            return Ok(None);
        };

        if !notetaker_enabled {
            info!(title = %event.title, "notetaker disabled for event, not scheduling a bot");
            return Ok(None);
        }

        if info.start_time <= Utc::now() {
            warn!(
                title = %event.title,
                start_time = %info.start_time,
                "meeting start time is in the past, not scheduling a bot"
            );
            return Ok(None);
        }

        let Some(data) = self
            .create_bot(&info.meeting_url, info.start_time, join_before_minutes)
            .await?
        else {
            return Ok(None);
        };

        let bot_id = data["id"]
            .as_str()
            .ok_or_else(|| ClientError::other("bot created but no id returned"))?
            .to_string();

        Ok(Some(ScheduledBot {
            bot_id,
            scheduled_for: info.start_time - Duration::minutes(join_before_minutes),
            status: "scheduled".to_string(),
            meeting_info: info,
            completed: None,
        }))
    }

    async fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl BotApi for RecallClient {
    async fn bot_status(&self, bot_id: &str) -> Result<Value, ClientError> {
        RecallClient::bot_status(self, bot_id).await
    }

    async fn bot_transcript(&self, bot_id: &str) -> Result<String, ClientError> {
        RecallClient::bot_transcript(self, bot_id).await
    }
}

fn transcript_download_url(bot: &Value) -> Option<&str> {
    bot.get("recordings")?
        .as_array()?
        .first()?
        .pointer("/media_shortcuts/transcript/data/download_url")?
        .as_str()
}

/// Normalize a transcript payload into "Speaker: text" lines. Two shapes
/// are recognized: a list of per-participant caption segments, and a dict
/// with a flat `segments` list of speaker/text entries.
pub(crate) fn parse_transcript(payload: &Value) -> Option<String> {
    if let Some(segments) = payload.as_array() {
        Some(parse_caption_segments(segments))
    } else {
        payload
            .get("segments")
            .and_then(Value::as_array)
            .map(|segments| parse_speaker_segments(segments))
    }
}

/// Caption shape: `[{participant: {name}, words: [{text}, ...]}, ...]`.
/// One paragraph per segment, words joined with spaces.
fn parse_caption_segments(segments: &[Value]) -> String {
    let mut transcript = String::new();
    for segment in segments {
        let speaker = segment
            .pointer("/participant/name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Speaker");
        let words: Vec<&str> = segment
            .get("words")
            .and_then(Value::as_array)
            .map(|words| {
                words
                    .iter()
                    .filter_map(|w| w["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        let text = words.join(" ");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if !transcript.is_empty() {
            transcript.push_str("\n\n");
        }
        transcript.push_str(speaker);
        transcript.push_str(": ");
        transcript.push_str(text);
    }
    transcript
}

/// Segment shape: `{segments: [{speaker, text}, ...]}`. Consecutive entries
/// from one speaker merge into a single paragraph.
fn parse_speaker_segments(segments: &[Value]) -> String {
    let mut transcript = String::new();
    let mut current_speaker: Option<&str> = None;
    for segment in segments {
        let speaker = segment["speaker"].as_str().unwrap_or("Unknown");
        let text = segment["text"].as_str().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        if current_speaker != Some(speaker) {
            if current_speaker.is_some() {
                transcript.push_str("\n\n");
            }
            transcript.push_str(speaker);
            transcript.push_str(": ");
            current_speaker = Some(speaker);
        } else {
            transcript.push(' ');
        }
        transcript.push_str(text);
    }
    transcript
}

/// First meeting-platform URL found in the given texts (event description
/// and location, in that order).
pub(crate) fn find_meeting_url(texts: &[&str]) -> Option<String> {
    for text in texts {
        for url in URL_RE.find_iter(text) {
            let lower = url.as_str().to_ascii_lowercase();
            if MEETING_URL_HOSTS.iter().any(|host| lower.contains(host)) {
                return Some(url.as_str().to_string());
            }
        }
    }
    None
}

/// Pull the bot-relevant metadata out of a calendar event. `None` when the
/// event has no meeting URL or its times don't parse.
pub(crate) fn extract_meeting_info(event: &CalendarEvent) -> Option<MeetingInfo> {
    let meeting_url = event
        .meeting_url
        .clone()
        .or_else(|| find_meeting_url(&[&event.description, &event.location]))?;

    let start_time = parse_rfc3339(&event.start_time)?;
    let end_time = parse_rfc3339(&event.end_time)?;
    let duration_minutes = (end_time - start_time).num_minutes().max(0);

    Some(MeetingInfo {
        platform: MeetingPlatform::from_url(&meeting_url),
        meeting_url,
        start_time,
        duration_minutes,
        title: event.title.clone(),
        attendees: event.attendees.clone(),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
