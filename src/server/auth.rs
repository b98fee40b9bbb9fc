//! OAuth flows and account management handlers.

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::clients::build_query;
use crate::server::{calendar, ApiError, AppState};
use crate::traits::GoogleAccount;
use crate::types::SocialPlatform;

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    #[allow(dead_code)]
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/google — consent URL for the frontend to open.
pub async fn google_auth_url(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let google = state.google()?;
    let flow_state = uuid::Uuid::new_v4().to_string();
    Ok(Json(json!({
        "auth_url": google.auth_url(&flow_state),
        "state": flow_state,
    })))
}

/// GET /auth/google/callback — exchange the code, store the account, and
/// bounce the browser back to the frontend with the session parameters.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Redirect, ApiError> {
    if let Some(err) = query.error {
        return Err(ApiError::bad_request(format!(
            "Authorization denied: {}",
            err
        )));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::bad_request("No authorization code provided"))?;

    let google = state.google()?;
    let tokens = google.exchange_code(&code).await?;
    let user = google.user_info(&tokens.access_token).await?;

    let account = GoogleAccount {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        picture: user.picture.clone(),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token,
        connected_at: Utc::now(),
        last_synced_at: None,
    };
    state.store.upsert_account(account).await?;
    info!(email = %user.email, "Google account connected");

    let picture = user.picture.unwrap_or_default();
    let params = build_query(&[
        ("access_token", &tokens.access_token),
        ("token_type", "bearer"),
        ("user_id", &user.id),
        ("user_email", &user.email),
        ("user_name", &user.name),
        ("user_picture", &picture),
        ("google_account_id", &user.id),
        ("google_account_email", &user.email),
        ("google_account_active", "true"),
    ]);
    Ok(Redirect::temporary(&format!(
        "{}/auth/success?{}",
        state.config.server.frontend_base_url, params
    )))
}

/// GET /auth/linkedin/callback
pub async fn linkedin_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Redirect, ApiError> {
    social_callback(state, SocialPlatform::Linkedin, query).await
}

/// GET /auth/facebook/callback
pub async fn facebook_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Redirect, ApiError> {
    social_callback(state, SocialPlatform::Facebook, query).await
}

async fn social_callback(
    state: AppState,
    platform: SocialPlatform,
    query: OAuthCallbackQuery,
) -> Result<Redirect, ApiError> {
    let code = query
        .code
        .ok_or_else(|| ApiError::bad_request("No authorization code provided"))?;
    let social = state.social()?;
    let tokens = social.exchange_code(platform, &code).await?;
    info!(platform = platform.as_str(), "social account connected");

    let params = build_query(&[
        ("access_token", tokens.access_token.as_str()),
        ("platform", platform.as_str()),
        ("status", "success"),
    ]);
    Ok(Redirect::temporary(&format!(
        "{}/auth/success?{}",
        state.config.server.frontend_base_url, params
    )))
}

/// GET /user/profile — single-user demo profile.
pub async fn user_profile() -> Json<Value> {
    Json(json!({
        "id": 1,
        "email": "test@example.com",
        "name": "Test User",
        "picture": null,
    }))
}

/// GET /user/google-accounts — connected accounts with live event counts.
pub async fn list_google_accounts(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let accounts = state.store.list_accounts().await?;
    if accounts.is_empty() {
        return Ok(Json(json!([])));
    }

    let mut rows = Vec::with_capacity(accounts.len());
    for (i, account) in accounts.iter().enumerate() {
        let events_count = match &state.integrations.google {
            Some(google) => {
                match calendar::events_with_refresh(&state.store, google, account).await {
                    Ok(events) => events.len(),
                    Err(e) => {
                        error!(account = %account.email, error = %e, "event count failed");
                        0
                    }
                }
            }
            None => 0,
        };
        rows.push(json!({
            "id": account.id,
            "email": account.email,
            "name": account.name,
            "picture": account.picture,
            "is_active": true,
            "is_primary": i == 0,
            "status": "active",
            "events_count": events_count,
            "last_sync": account.last_synced_at.map(|t| t.to_rfc3339()),
            "error_message": null,
        }));
    }
    Ok(Json(Value::Array(rows)))
}

/// POST /user/google-accounts/connect
pub async fn connect_google_account(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let google = state.google()?;
    let flow_state = uuid::Uuid::new_v4().to_string();
    Ok(Json(json!({
        "auth_url": google.auth_url(&flow_state),
        "state": flow_state,
    })))
}

/// DELETE /user/google-accounts/{account_id}/disconnect
pub async fn disconnect_google_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.remove_account(&account_id).await? {
        return Err(ApiError::not_found("Account not found"));
    }
    info!(account_id = %account_id, "Google account disconnected");
    Ok(Json(json!({
        "message": "Google account disconnected successfully",
        "account_id": account_id,
    })))
}

/// POST /user/google-accounts/{account_id}/sync
pub async fn sync_google_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .store
        .get_account(&account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;
    let google = state.google()?;

    let events = calendar::events_with_refresh(&state.store, &google, &account)
        .await
        .map_err(|e| {
            error!(account = %account.email, error = %e, "sync failed");
            ApiError::from(e)
        })?;

    // Re-read: a token refresh inside events_with_refresh may have replaced
    // the stored record.
    if let Some(mut current) = state.store.get_account(&account_id).await? {
        current.last_synced_at = Some(Utc::now());
        state.store.upsert_account(current).await?;
    }

    info!(account_id = %account_id, count = events.len(), "account synced");
    Ok(Json(json!({
        "message": "Account synced successfully",
        "account_id": account_id,
        "events_synced": events.len(),
    })))
}

/// GET /social-media/accounts — demo listing.
pub async fn social_accounts() -> Json<Value> {
    Json(json!([
        {
            "id": 1,
            "platform": "linkedin",
            "account_name": "John Doe",
            "is_active": true,
        }
    ]))
}

/// POST /social-media/connect/{platform}
pub async fn connect_social_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let platform = SocialPlatform::parse(&platform)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported platform: {}", platform)))?;
    let social = state.social()?;
    let flow_state = uuid::Uuid::new_v4().to_string();
    let auth_url = social
        .auth_url(platform, &flow_state)
        .map_err(|e| ApiError::unavailable(e.message))?;
    Ok(Json(json!({"auth_url": auth_url})))
}
