//! Bot-management handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::clients::ClientErrorKind;
use crate::server::{calendar, ApiError, AppState};

/// GET /recall/bots — current status of every bot in the managed set.
pub async fn list_managed_bots(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let recall = state.recall()?;
    let bot_ids = state.store.managed_bot_ids().await?;

    let mut rows = Vec::with_capacity(bot_ids.len());
    for bot_id in bot_ids {
        match recall.bot_status(&bot_id).await {
            Ok(status) => rows.push(json!({
                "bot_id": bot_id,
                "status": status["status"].as_str().unwrap_or("unknown"),
                "meeting_url": status["meeting_url"],
                "start_time": status["start_time"],
                "end_time": status["end_time"],
            })),
            Err(e) => {
                warn!(bot_id = %bot_id, error = %e, "bot status fetch failed, skipping");
            }
        }
    }

    Ok(Json(json!({
        "total_bots": rows.len(),
        "managed_bots": rows,
    })))
}

/// GET /recall/bots/{bot_id}/status — pass-through status document.
pub async fn bot_status(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let recall = state.recall()?;
    let status = recall.bot_status(&bot_id).await.map_err(|e| {
        if e.kind == ClientErrorKind::NotFound {
            ApiError::not_found("Bot not found")
        } else {
            e.into()
        }
    })?;
    Ok(Json(status))
}

/// GET /recall/bots/{bot_id}/transcript
pub async fn bot_transcript(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let recall = state.recall()?;
    let transcript = recall.bot_transcript(&bot_id).await.map_err(|e| {
        if matches!(e.kind, ClientErrorKind::NotFound | ClientErrorKind::Unknown) {
            ApiError::not_found("Transcript not available")
        } else {
            e.into()
        }
    })?;
    Ok(Json(json!({"transcript": transcript})))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    pub recall_join_before_minutes: Option<i64>,
}

/// POST /recall/schedule — dispatch bots for every notetaker-enabled event
/// that doesn't have one yet. Per-event failures land in `errors`.
pub async fn schedule_bots(
    State(state): State<AppState>,
    body: Option<Json<ScheduleBody>>,
) -> Result<Json<Value>, ApiError> {
    let recall = state.recall()?;
    let google = state.google()?;

    let join_before = match body.and_then(|Json(b)| b.recall_join_before_minutes) {
        Some(minutes) => minutes,
        None => state.store.settings().await?.recall_join_before_minutes,
    };

    let mut scheduled_count = 0usize;
    let mut errors = Vec::new();

    for account in state.store.list_accounts().await? {
        let events =
            match calendar::events_with_refresh(&state.store, &google, &account).await {
                Ok(events) => events,
                Err(e) => {
                    error!(account = %account.email, error = %e, "event fetch failed");
                    errors.push(format!(
                        "Error processing events for account {}",
                        account.email
                    ));
                    continue;
                }
            };

        for (i, event) in events.iter().enumerate() {
            let event_id = format!("{}_{}", account.id, i);
            if !state.store.notetaker_enabled(&event_id).await?
                || state.store.get_scheduled_bot(&event_id).await?.is_some()
            {
                continue;
            }

            match recall.schedule_bot_for_event(event, true, join_before).await {
                Ok(Some(bot)) => {
                    state.store.add_managed_bot(&bot.bot_id).await?;
                    state.store.insert_scheduled_bot(&event_id, bot).await?;
                    scheduled_count += 1;
                    info!(event_id = %event_id, "bot scheduled");
                }
                Ok(None) => {
                    errors.push(format!("Failed to schedule bot for event {}", event_id));
                }
                Err(e) => {
                    error!(event_id = %event_id, error = %e, "bot scheduling failed");
                    errors.push(format!("Failed to schedule bot for event {}", event_id));
                }
            }
        }
    }

    Ok(Json(json!({
        "message": format!("Scheduled {} bots", scheduled_count),
        "scheduled_count": scheduled_count,
        "errors": errors,
    })))
}

/// POST /recall/poll — run one reconcile cycle on demand.
pub async fn poll_bots(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let poller = state.poller()?;
    let completed = poller.run_cycle().await?;
    let completed_json = completed
        .iter()
        .filter_map(|bot| serde_json::to_value(bot).ok())
        .collect::<Vec<_>>();
    Ok(Json(json!({
        "message": format!("Polled {} completed bots", completed_json.len()),
        "completed_bots": completed_json,
    })))
}

/// GET /recall/status — registries at a glance.
pub async fn recall_status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.recall()?;
    let managed = state.store.managed_bot_ids().await?;
    let scheduled = state.store.list_scheduled_bots().await?;
    let completed = state.store.list_completed_meetings().await?;

    let mut scheduled_json = Map::new();
    for (event_id, bot) in &scheduled {
        if let Ok(value) = serde_json::to_value(bot) {
            scheduled_json.insert(event_id.clone(), value);
        }
    }

    Ok(Json(json!({
        "managed_bots": managed,
        "scheduled_bots": scheduled_json,
        "completed_meetings": completed.len(),
        "total_meetings": scheduled.len(),
    })))
}
