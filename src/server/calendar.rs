//! Calendar listing and the event-lookup helpers shared by the meeting and
//! bot handlers.
//!
//! Events are re-fetched from the calendar API on every request; the
//! synthetic event id `"{account_id}_{index}"` is the event's position in
//! that account's current listing.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};
use tracing::{error, warn};

use crate::clients::google::GoogleCalendarClient;
use crate::clients::{ClientError, ClientErrorKind};
use crate::server::{ApiError, AppState};
use crate::traits::{CalendarEvent, GoogleAccount, StateStore};

/// Fetch an account's events, refreshing the access token once on an auth
/// failure and persisting the rotated credential.
pub(crate) async fn events_with_refresh(
    store: &Arc<dyn StateStore>,
    google: &GoogleCalendarClient,
    account: &GoogleAccount,
) -> Result<Vec<CalendarEvent>, ClientError> {
    match google.calendar_events(&account.access_token).await {
        Err(e) if e.kind == ClientErrorKind::Auth => {
            let Some(refresh_token) = account.refresh_token.as_deref() else {
                return Err(e);
            };
            warn!(account = %account.email, "access token rejected, refreshing");
            let tokens = google.refresh_access_token(refresh_token).await?;

            let mut updated = account.clone();
            updated.access_token = tokens.access_token.clone();
            if tokens.refresh_token.is_some() {
                updated.refresh_token = tokens.refresh_token;
            }
            if let Err(store_err) = store.upsert_account(updated).await {
                error!(error = %store_err, "failed to persist refreshed token");
            }

            google.calendar_events(&tokens.access_token).await
        }
        other => other,
    }
}

/// Locate the account and event a synthetic event id points at. `None` when
/// no connected account currently lists a matching event.
pub(crate) async fn find_event(
    state: &AppState,
    event_id: &str,
) -> Result<Option<(GoogleAccount, CalendarEvent)>, ApiError> {
    let Some(google) = state.integrations.google.clone() else {
        return Ok(None);
    };
    for account in state.store.list_accounts().await? {
        let events = match events_with_refresh(&state.store, &google, &account).await {
            Ok(events) => events,
            Err(e) => {
                error!(account = %account.email, error = %e, "event lookup failed");
                continue;
            }
        };
        for (i, event) in events.into_iter().enumerate() {
            if format!("{}_{}", account.id, i) == event_id {
                return Ok(Some((account, event)));
            }
        }
    }
    Ok(None)
}

/// Serialize an event for the listing, stamped with the synthetic id,
/// account info, and the persisted notetaker flag.
pub(crate) fn event_view(
    event: &CalendarEvent,
    event_id: &str,
    account: &GoogleAccount,
    notetaker_enabled: bool,
) -> Value {
    let mut fields = match serde_json::to_value(event) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    fields.insert("id".into(), json!(event_id));
    fields.insert("google_account_email".into(), json!(account.email));
    fields.insert("google_account_name".into(), json!(account.name));
    fields.insert("calendar_name".into(), json!("Primary Calendar"));
    fields.insert("notetaker_enabled".into(), json!(notetaker_enabled));
    Value::Object(fields)
}

/// GET /calendar/events — merged upcoming events across all accounts.
/// Per-account fetch failures are logged and skipped.
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let Some(google) = state.integrations.google.clone() else {
        warn!("Google Calendar service not available");
        return Ok(Json(json!({"events": [], "accounts": []})));
    };

    let mut events_json = Vec::new();
    let mut accounts_info = Vec::new();
    for account in state.store.list_accounts().await? {
        match events_with_refresh(&state.store, &google, &account).await {
            Ok(events) => {
                for (i, event) in events.iter().enumerate() {
                    let event_id = format!("{}_{}", account.id, i);
                    let enabled = state.store.notetaker_enabled(&event_id).await?;
                    events_json.push(event_view(event, &event_id, &account, enabled));
                }
                accounts_info.push(json!({
                    "email": account.email,
                    "name": account.name,
                    "events_count": events.len(),
                }));
            }
            Err(e) => {
                error!(account = %account.email, error = %e, "failed to fetch calendar events");
            }
        }
    }

    Ok(Json(json!({
        "events": events_json,
        "accounts": accounts_info,
    })))
}
