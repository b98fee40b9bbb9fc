//! HTTP route layer: parse the request, consult a registry or make one
//! client call, shape a JSON response.

pub mod auth;
pub mod bots;
pub mod calendar;
pub mod meetings;
pub mod settings;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::error;

use crate::clients::google::GoogleCalendarClient;
use crate::clients::openai::ContentGenerator;
use crate::clients::recall::RecallClient;
use crate::clients::social::SocialClient;
use crate::clients::{ClientError, ClientErrorKind};
use crate::config::{AppConfig, ServerConfig};
use crate::integrations::Integrations;
use crate::poller::CompletionPoller;
use crate::traits::StateStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Route-level error: an HTTP status plus an `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        let status = match err.kind {
            ClientErrorKind::NotFound => StatusCode::NOT_FOUND,
            ClientErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "internal error");
        Self::internal("Internal server error")
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub integrations: Arc<Integrations>,
    pub poller: Option<Arc<CompletionPoller>>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn google(&self) -> Result<Arc<GoogleCalendarClient>, ApiError> {
        self.integrations
            .google
            .clone()
            .ok_or_else(|| ApiError::unavailable("Google Calendar service not available"))
    }

    pub fn recall(&self) -> Result<Arc<RecallClient>, ApiError> {
        self.integrations
            .recall
            .clone()
            .ok_or_else(|| ApiError::unavailable("Recall service not available"))
    }

    pub fn content(&self) -> Result<Arc<ContentGenerator>, ApiError> {
        self.integrations
            .content
            .clone()
            .ok_or_else(|| ApiError::unavailable("AI service not available"))
    }

    pub fn social(&self) -> Result<Arc<SocialClient>, ApiError> {
        self.integrations
            .social
            .clone()
            .ok_or_else(|| ApiError::unavailable("Social media service not available"))
    }

    pub fn poller(&self) -> Result<Arc<CompletionPoller>, ApiError> {
        self.poller
            .clone()
            .ok_or_else(|| ApiError::unavailable("Recall service not available"))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/google", get(auth::google_auth_url))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/linkedin/callback", get(auth::linkedin_callback))
        .route("/auth/facebook/callback", get(auth::facebook_callback))
        .route("/user/profile", get(auth::user_profile))
        .route("/user/google-accounts", get(auth::list_google_accounts))
        .route(
            "/user/google-accounts/connect",
            post(auth::connect_google_account),
        )
        .route(
            "/user/google-accounts/{account_id}/disconnect",
            delete(auth::disconnect_google_account),
        )
        .route(
            "/user/google-accounts/{account_id}/sync",
            post(auth::sync_google_account),
        )
        .route("/calendar/events", get(calendar::list_events))
        .route(
            "/meetings/{meeting_id}/notetaker",
            patch(meetings::toggle_notetaker),
        )
        .route("/meetings/past", get(meetings::past_meetings))
        .route(
            "/meetings/{meeting_id}/transcript",
            get(meetings::get_transcript).post(meetings::update_transcript),
        )
        .route(
            "/meetings/{meeting_id}/social-content",
            post(meetings::generate_social_content),
        )
        .route(
            "/meetings/{meeting_id}/social-post",
            post(meetings::generate_social_post),
        )
        .route(
            "/meetings/{meeting_id}/follow-up-email",
            post(meetings::generate_follow_up_email),
        )
        .route(
            "/meetings/{meeting_id}/post/{platform}",
            post(meetings::publish_post),
        )
        .route("/social-media/accounts", get(auth::social_accounts))
        .route(
            "/social-media/connect/{platform}",
            post(auth::connect_social_platform),
        )
        .route("/recall/bots", get(bots::list_managed_bots))
        .route("/recall/bots/{bot_id}/status", get(bots::bot_status))
        .route("/recall/bots/{bot_id}/transcript", get(bots::bot_transcript))
        .route("/recall/schedule", post(bots::schedule_bots))
        .route("/recall/poll", post(bots::poll_bots))
        .route("/recall/status", get(bots::recall_status))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ---------------------------------------------------------------------------
// Status handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "recapd post-meeting content API",
        "status": "running",
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let scheduled = state.store.list_scheduled_bots().await?.len();
    let completed = state.store.list_completed_meetings().await?.len();
    let poller = state
        .poller
        .as_ref()
        .map(|p| p.telemetry().snapshot());

    Ok(Json(json!({
        "status": "healthy",
        "message": "Backend is running successfully",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "services": {
            "google_calendar": state.integrations.google.is_some(),
            "recall": state.integrations.recall.is_some(),
            "ai": state.integrations.content.is_some(),
            "social_media": state.integrations.social.is_some(),
        },
        "scheduled_bots": scheduled,
        "completed_meetings": completed,
        "poller": poller,
    })))
}
