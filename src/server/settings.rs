//! Settings handlers: one flat object, partial updates merge known keys.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::server::{ApiError, AppState};
use crate::traits::{SettingsPatch, UserSettings};

/// GET /settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(state.store.settings().await?))
}

/// PUT /settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.store.update_settings(patch).await?;
    info!(
        join_before = settings.recall_join_before_minutes,
        default_platform = %settings.default_platform,
        "settings updated"
    );
    Ok(Json(json!({
        "message": "Settings updated successfully",
        "settings": settings,
    })))
}
