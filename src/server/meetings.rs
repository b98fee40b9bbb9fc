//! Meeting handlers: notetaker toggling, completed-meeting retrieval, and
//! content generation/publishing.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::server::{calendar, ApiError, AppState};
use crate::traits::CompletedMeeting;
use crate::types::SocialPlatform;

#[derive(Debug, Deserialize)]
pub struct NotetakerBody {
    #[serde(default)]
    pub notetaker_enabled: bool,
}

/// PATCH /meetings/{meeting_id}/notetaker — persist the flag; when enabling,
/// dispatch a bot for the event right away if one isn't scheduled yet.
pub async fn toggle_notetaker(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(body): Json<NotetakerBody>,
) -> Result<Json<Value>, ApiError> {
    let enabled = body.notetaker_enabled;
    state.store.set_notetaker(&meeting_id, enabled).await?;
    info!(meeting_id = %meeting_id, enabled, "notetaker setting updated");

    if enabled && state.store.get_scheduled_bot(&meeting_id).await?.is_none() {
        if let Some(recall) = state.integrations.recall.clone() {
            match calendar::find_event(&state, &meeting_id).await? {
                Some((_, event)) => {
                    let join_before = state.store.settings().await?.recall_join_before_minutes;
                    match recall
                        .schedule_bot_for_event(&event, true, join_before)
                        .await
                    {
                        Ok(Some(bot)) => {
                            state.store.add_managed_bot(&bot.bot_id).await?;
                            state
                                .store
                                .insert_scheduled_bot(&meeting_id, bot)
                                .await?;
                            info!(meeting_id = %meeting_id, "bot scheduled for event");
                        }
                        Ok(None) => {
                            warn!(meeting_id = %meeting_id, "event not eligible for a bot");
                        }
                        Err(e) => {
                            error!(meeting_id = %meeting_id, error = %e, "bot scheduling failed");
                        }
                    }
                }
                None => warn!(meeting_id = %meeting_id, "event not found in calendar"),
            }
        }
    }

    let bot_scheduled =
        enabled && state.store.get_scheduled_bot(&meeting_id).await?.is_some();
    Ok(Json(json!({
        "message": "Notetaker setting updated",
        "meeting_id": meeting_id,
        "notetaker_enabled": enabled,
        "bot_scheduled": bot_scheduled,
    })))
}

/// GET /meetings/past — completed meetings joined with their original
/// calendar events, newest first. Meetings whose event can no longer be
/// found are skipped.
pub async fn past_meetings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let completed = state.store.list_completed_meetings().await?;
    let mut meetings = Vec::with_capacity(completed.len());

    for meeting in completed {
        match calendar::find_event(&state, &meeting.meeting_id).await? {
            Some((account, event)) => {
                let attendees = if meeting.attendees.is_empty() {
                    event.attendees.clone()
                } else {
                    meeting.attendees.clone()
                };
                meetings.push(json!({
                    "id": meeting.meeting_id,
                    "title": meeting.title,
                    "start_time": event.start_time,
                    "end_time": event.end_time,
                    "attendees": attendees,
                    "platform": meeting.platform,
                    "transcript": meeting.transcript,
                    "status": meeting.status,
                    "completed_at": meeting.completed_at.to_rfc3339(),
                    "duration": meeting.duration_secs,
                    "media_url": meeting.media_url,
                    "google_account_email": account.email,
                    "google_account_name": account.name,
                }));
            }
            None => {
                warn!(
                    meeting_id = %meeting.meeting_id,
                    "no calendar event matches completed meeting, skipping"
                );
            }
        }
    }

    meetings.sort_by(|a, b| b["start_time"].as_str().cmp(&a["start_time"].as_str()));
    Ok(Json(json!({"meetings": meetings})))
}

/// GET /meetings/{meeting_id}/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let meeting = completed_meeting(&state, &meeting_id).await?;
    Ok(Json(json!({
        "meeting_id": meeting_id,
        "transcript": meeting.transcript,
        "status": meeting.status,
        "completed_at": meeting.completed_at.to_rfc3339(),
        "duration": meeting.duration_secs,
        "media_url": meeting.media_url,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TranscriptBody {
    #[serde(default)]
    pub transcript: String,
}

/// POST /meetings/{meeting_id}/transcript — manual transcript correction.
pub async fn update_transcript(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(body): Json<TranscriptBody>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .store
        .set_transcript(&meeting_id, &body.transcript)
        .await?
    {
        return Err(ApiError::not_found("Meeting not found or not completed"));
    }
    info!(meeting_id = %meeting_id, chars = body.transcript.len(), "transcript updated");
    Ok(Json(json!({
        "message": "Transcript updated",
        "meeting_id": meeting_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SocialContentBody {
    #[serde(default)]
    pub transcript: String,
}

/// POST /meetings/{meeting_id}/social-content — generate post text from a
/// caller-supplied transcript (used before the meeting is in the registry).
pub async fn generate_social_content(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(body): Json<SocialContentBody>,
) -> Result<Json<Value>, ApiError> {
    if body.transcript.is_empty() {
        return Err(ApiError::bad_request("Transcript is required"));
    }
    let generator = state.content()?;
    let platform = state.store.settings().await?.default_platform;
    let content = generator
        .social_content(&body.transcript, "Meeting", &platform)
        .await?;
    info!(meeting_id = %meeting_id, "generated social content");
    Ok(Json(json!({
        "social_content": content,
        "meeting_id": meeting_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SocialPostBody {
    pub platform: Option<String>,
    pub custom_prompt: Option<String>,
}

/// POST /meetings/{meeting_id}/social-post — platform-targeted post from
/// the stored transcript, split into content/hashtags.
pub async fn generate_social_post(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    Json(body): Json<SocialPostBody>,
) -> Result<Json<Value>, ApiError> {
    let meeting = completed_meeting(&state, &meeting_id).await?;
    if meeting.transcript.is_empty() {
        return Err(ApiError::bad_request(
            "No transcript available for this meeting",
        ));
    }

    let generator = state.content()?;
    let platform = body.platform.unwrap_or_else(|| "linkedin".to_string());
    let post = generator
        .social_post(
            &meeting.transcript,
            &meeting.title,
            &platform,
            body.custom_prompt.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "meeting_id": meeting_id,
        "post": post,
        "meeting_title": meeting.title,
    })))
}

/// POST /meetings/{meeting_id}/follow-up-email
pub async fn generate_follow_up_email(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let meeting = completed_meeting(&state, &meeting_id).await?;
    if meeting.transcript.is_empty() {
        return Err(ApiError::bad_request(
            "No transcript available for this meeting",
        ));
    }

    let generator = state.content()?;
    let attendees: Vec<String> = meeting
        .attendees
        .iter()
        .filter_map(|a| a.name.clone().or_else(|| a.email.clone()))
        .collect();
    let email_content = generator
        .follow_up_email(&meeting.transcript, &meeting.title, &attendees)
        .await?;
    info!(meeting_id = %meeting_id, "generated follow-up email");

    Ok(Json(json!({
        "meeting_id": meeting_id,
        "email_content": email_content,
        "meeting_title": meeting.title,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    pub access_token: Option<String>,
    pub content: Option<String>,
}

/// POST /meetings/{meeting_id}/post/{platform} — publish caller-supplied
/// content with the caller's token.
pub async fn publish_post(
    State(state): State<AppState>,
    Path((meeting_id, platform)): Path<(String, String)>,
    Json(body): Json<PublishBody>,
) -> Result<Json<Value>, ApiError> {
    let platform = SocialPlatform::parse(&platform)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported platform: {}", platform)))?;
    let access_token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Access token is required"))?;
    let content = body
        .content
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Content is required"))?;

    let social = state.social()?;
    let outcome = social.post(platform, &access_token, &content).await?;
    info!(
        meeting_id = %meeting_id,
        platform = platform.as_str(),
        post_id = %outcome.post_id,
        "published post"
    );

    let mut response = json!({
        "message": outcome.message,
        "post_id": outcome.post_id,
    });
    if let Some(obj) = response.as_object_mut() {
        if let Some(share_url) = outcome.share_url {
            obj.insert("share_url".into(), json!(share_url));
        }
        if let Some(user_name) = outcome.user_name {
            obj.insert("user_name".into(), json!(user_name));
        }
        if let Some(note) = outcome.note {
            obj.insert("note".into(), json!(note));
        }
    }
    Ok(Json(response))
}

async fn completed_meeting(
    state: &AppState,
    meeting_id: &str,
) -> Result<CompletedMeeting, ApiError> {
    state
        .store
        .get_completed_meeting(meeting_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meeting not found or not completed"))
}
