//! Google OAuth and Calendar API client.
//!
//! Stateless per call: every method takes the tokens it needs, issues one
//! request, and reshapes the response. Accounts and their credentials live
//! in the state store, not here.

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::{build_query, recall, ClientError, REQUEST_TIMEOUT};
use crate::config::GoogleConfig;
use crate::traits::{Attendee, CalendarEvent};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

const SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/calendar.readonly",
];

/// How far ahead the event listing looks.
const LOOKAHEAD_DAYS: i64 = 30;
const MAX_EVENTS: u32 = 50;

#[derive(Debug, Clone)]
pub struct GoogleTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub verified_email: bool,
}

pub struct GoogleCalendarClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Consent URL requesting offline access so a refresh token is issued.
    pub fn auth_url(&self, state: &str) -> String {
        let scopes = SCOPES.join(" ");
        format!(
            "{}?{}",
            AUTH_URL,
            build_query(&[
                ("response_type", "code"),
                ("client_id", &self.client_id),
                ("redirect_uri", &self.redirect_uri),
                ("scope", &scopes),
                ("state", state),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
            ])
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, ClientError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
        ];
        let data = self.token_request(&params).await?;
        parse_tokens(&data)
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<GoogleTokens, ClientError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        let data = self.token_request(&params).await?;
        parse_tokens(&data)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<Value, ClientError> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed token response: {}", e)))
    }

    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, ClientError> {
        let data = self.get_json(USERINFO_URL, access_token).await?;
        let id = data["id"]
            .as_str()
            .ok_or_else(|| ClientError::other("userinfo response missing id"))?
            .to_string();
        Ok(GoogleUserInfo {
            id,
            email: data["email"].as_str().unwrap_or_default().to_string(),
            name: data["name"].as_str().unwrap_or_default().to_string(),
            picture: data["picture"].as_str().map(str::to_string),
            verified_email: data["verified_email"].as_bool().unwrap_or(false),
        })
    }

    /// Upcoming events on the primary calendar, now through now+30 days.
    pub async fn calendar_events(
        &self,
        access_token: &str,
    ) -> Result<Vec<CalendarEvent>, ClientError> {
        let now = Utc::now();
        let time_min = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = (now + chrono::Duration::days(LOOKAHEAD_DAYS))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = format!(
            "{}?{}",
            EVENTS_URL,
            build_query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("maxResults", &MAX_EVENTS.to_string()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
        );
        let data = self.get_json(&url, access_token).await?;

        let items = data["items"].as_array().cloned().unwrap_or_default();
        let mut events = Vec::with_capacity(items.len());
        for item in &items {
            match transform_event(item) {
                Some(event) => events.push(event),
                None => {
                    warn!(
                        event_id = item["id"].as_str().unwrap_or("unknown"),
                        "skipping event without usable start/end times"
                    );
                }
            }
        }
        debug!(count = events.len(), "fetched calendar events");
        Ok(events)
    }

    async fn get_json(&self, url: &str, access_token: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
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

fn parse_tokens(data: &Value) -> Result<GoogleTokens, ClientError> {
    let access_token = data["access_token"]
        .as_str()
        .ok_or_else(|| ClientError::other("no access_token in response"))?
        .to_string();
    Ok(GoogleTokens {
        access_token,
        refresh_token: data["refresh_token"].as_str().map(str::to_string),
        expires_in: data["expires_in"].as_u64(),
    })
}

/// Normalize one raw calendar API item. All-day events carry `date` rather
/// than `dateTime`; they expand to midnight-to-midnight bounds. Items with
/// no usable start or end are dropped.
pub(crate) fn transform_event(item: &Value) -> Option<CalendarEvent> {
    let start_time = event_time(&item["start"], "T00:00:00Z")?;
    let end_time = event_time(&item["end"], "T23:59:59Z")?;

    let description = item["description"].as_str().unwrap_or_default().to_string();
    let location = item["location"].as_str().unwrap_or_default().to_string();

    let attendees = item["attendees"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|a| Attendee {
                    email: a["email"].as_str().map(str::to_string),
                    name: a["displayName"].as_str().map(str::to_string),
                    response_status: a["responseStatus"]
                        .as_str()
                        .unwrap_or("needsAction")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let meeting_url = recall::find_meeting_url(&[&description, &location]);

    Some(CalendarEvent {
        google_event_id: item["id"].as_str().map(str::to_string),
        title: item["summary"].as_str().unwrap_or("No Title").to_string(),
        description,
        start_time,
        end_time,
        location,
        attendees,
        meeting_url,
        creator: item["creator"]["email"].as_str().map(str::to_string),
        organizer: item["organizer"]["email"].as_str().map(str::to_string),
        status: item["status"].as_str().map(str::to_string),
        html_link: item["htmlLink"].as_str().map(str::to_string),
    })
}

fn event_time(bound: &Value, all_day_suffix: &str) -> Option<String> {
    if let Some(dt) = bound["dateTime"].as_str() {
        Some(dt.to_string())
    } else {
        bound["date"]
            .as_str()
            .map(|d| format!("{}{}", d, all_day_suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_timed_event() {
        let item = json!({
            "id": "ev1",
            "summary": "Planning",
            "description": "Join: https://zoom.us/j/42",
            "start": {"dateTime": "2026-08-10T10:00:00Z"},
            "end": {"dateTime": "2026-08-10T10:30:00Z"},
            "attendees": [
                {"email": "a@example.com", "displayName": "Ada", "responseStatus": "accepted"},
                {"email": "b@example.com"}
            ],
            "creator": {"email": "a@example.com"},
            "organizer": {"email": "a@example.com"},
            "status": "confirmed",
            "htmlLink": "https://calendar.google.com/event?eid=ev1"
        });
        let event = transform_event(&item).unwrap();
        assert_eq!(event.title, "Planning");
        assert_eq!(event.start_time, "2026-08-10T10:00:00Z");
        assert_eq!(event.meeting_url.as_deref(), Some("https://zoom.us/j/42"));
        assert_eq!(event.attendees.len(), 2);
        assert_eq!(event.attendees[0].name.as_deref(), Some("Ada"));
        assert_eq!(event.attendees[1].response_status, "needsAction");
    }

    #[test]
    fn test_transform_all_day_event() {
        let item = json!({
            "id": "ev2",
            "summary": "Offsite",
            "start": {"date": "2026-08-11"},
            "end": {"date": "2026-08-11"}
        });
        let event = transform_event(&item).unwrap();
        assert_eq!(event.start_time, "2026-08-11T00:00:00Z");
        assert_eq!(event.end_time, "2026-08-11T23:59:59Z");
        assert!(event.meeting_url.is_none());
    }

    #[test]
    fn test_transform_drops_event_without_times() {
        let item = json!({"id": "ev3", "summary": "Broken", "start": {}, "end": {}});
        assert!(transform_event(&item).is_none());
    }

    #[test]
    fn test_untitled_event_gets_placeholder() {
        let item = json!({
            "start": {"dateTime": "2026-08-10T10:00:00Z"},
            "end": {"dateTime": "2026-08-10T11:00:00Z"}
        });
        assert_eq!(transform_event(&item).unwrap().title, "No Title");
    }

    #[test]
    fn test_meeting_url_found_in_location() {
        let item = json!({
            "summary": "Sync",
            "location": "https://meet.google.com/abc-defg-hij",
            "start": {"dateTime": "2026-08-10T10:00:00Z"},
            "end": {"dateTime": "2026-08-10T11:00:00Z"}
        });
        let event = transform_event(&item).unwrap();
        assert_eq!(
            event.meeting_url.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
    }

    #[test]
    fn test_auth_url_contains_offline_access() {
        let client = GoogleCalendarClient::new(&GoogleConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:8000/auth/google/callback".into(),
        })
        .unwrap();
        let url = client.auth_url("xyz");
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("calendar.readonly"));
    }
}
