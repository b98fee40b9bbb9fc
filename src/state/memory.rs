//! In-memory `StateStore`. Everything lives for the lifetime of the process
//! and is gone on restart; the seed-bot config exists to re-adopt bots that
//! survived a restart on the provider side.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::traits::{
    CompletedBot, CompletedMeeting, GoogleAccount, ScheduledBot, SettingsPatch, StateStore,
    UserSettings,
};

#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, GoogleAccount>>,
    notetaker: RwLock<HashMap<String, bool>>,
    scheduled: RwLock<HashMap<String, ScheduledBot>>,
    completed: RwLock<HashMap<String, CompletedMeeting>>,
    managed: RwLock<HashSet<String>>,
    settings: RwLock<UserSettings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn upsert_account(&self, account: GoogleAccount) -> anyhow::Result<()> {
        self.accounts
            .write()
            .await
            .insert(account.id.clone(), account);
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> anyhow::Result<Option<GoogleAccount>> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<GoogleAccount>> {
        let mut accounts: Vec<GoogleAccount> =
            self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));
        Ok(accounts)
    }

    async fn remove_account(&self, account_id: &str) -> anyhow::Result<bool> {
        Ok(self.accounts.write().await.remove(account_id).is_some())
    }

    async fn notetaker_enabled(&self, event_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .notetaker
            .read()
            .await
            .get(event_id)
            .copied()
            .unwrap_or(false))
    }

    async fn set_notetaker(&self, event_id: &str, enabled: bool) -> anyhow::Result<()> {
        self.notetaker
            .write()
            .await
            .insert(event_id.to_string(), enabled);
        Ok(())
    }

    async fn insert_scheduled_bot(
        &self,
        event_id: &str,
        bot: ScheduledBot,
    ) -> anyhow::Result<()> {
        self.scheduled
            .write()
            .await
            .insert(event_id.to_string(), bot);
        Ok(())
    }

    async fn get_scheduled_bot(&self, event_id: &str) -> anyhow::Result<Option<ScheduledBot>> {
        Ok(self.scheduled.read().await.get(event_id).cloned())
    }

    async fn list_scheduled_bots(&self) -> anyhow::Result<Vec<(String, ScheduledBot)>> {
        Ok(self
            .scheduled
            .read()
            .await
            .iter()
            .map(|(id, bot)| (id.clone(), bot.clone()))
            .collect())
    }

    async fn find_event_for_bot(&self, bot_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .scheduled
            .read()
            .await
            .iter()
            .find(|(_, bot)| bot.bot_id == bot_id)
            .map(|(event_id, _)| event_id.clone()))
    }

    async fn mark_bot_completed(
        &self,
        event_id: &str,
        payload: CompletedBot,
    ) -> anyhow::Result<bool> {
        let mut scheduled = self.scheduled.write().await;
        match scheduled.get_mut(event_id) {
            Some(bot) => {
                bot.status = "completed".to_string();
                bot.completed = Some(payload);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_completed_meeting(
        &self,
        meeting: CompletedMeeting,
    ) -> anyhow::Result<bool> {
        let mut completed = self.completed.write().await;
        if completed.contains_key(&meeting.meeting_id) {
            return Ok(false);
        }
        completed.insert(meeting.meeting_id.clone(), meeting);
        Ok(true)
    }

    async fn get_completed_meeting(
        &self,
        event_id: &str,
    ) -> anyhow::Result<Option<CompletedMeeting>> {
        Ok(self.completed.read().await.get(event_id).cloned())
    }

    async fn list_completed_meetings(&self) -> anyhow::Result<Vec<CompletedMeeting>> {
        Ok(self.completed.read().await.values().cloned().collect())
    }

    async fn set_transcript(&self, event_id: &str, transcript: &str) -> anyhow::Result<bool> {
        let mut completed = self.completed.write().await;
        match completed.get_mut(event_id) {
            Some(meeting) => {
                meeting.transcript = transcript.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_managed_bot(&self, bot_id: &str) -> anyhow::Result<()> {
        self.managed.write().await.insert(bot_id.to_string());
        Ok(())
    }

    async fn remove_managed_bot(&self, bot_id: &str) -> anyhow::Result<bool> {
        Ok(self.managed.write().await.remove(bot_id))
    }

    async fn managed_bot_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.managed.read().await.iter().cloned().collect())
    }

    async fn settings(&self) -> anyhow::Result<UserSettings> {
        Ok(self.settings.read().await.clone())
    }

    async fn update_settings(&self, patch: SettingsPatch) -> anyhow::Result<UserSettings> {
        let mut settings = self.settings.write().await;
        if let Some(v) = patch.recall_join_before_minutes {
            settings.recall_join_before_minutes = v;
        }
        if let Some(v) = patch.enable_notifications {
            settings.enable_notifications = v;
        }
        if let Some(v) = patch.auto_generate_content {
            settings.auto_generate_content = v;
        }
        if let Some(v) = patch.default_platform {
            settings.default_platform = v;
        }
        if let Some(v) = patch.linkedin_prompt {
            settings.linkedin_prompt = v;
        }
        if let Some(v) = patch.facebook_prompt {
            settings.facebook_prompt = v;
        }
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Attendee, MeetingInfo};
    use crate::types::MeetingPlatform;
    use chrono::Utc;
    use serde_json::json;

    fn account(id: &str) -> GoogleAccount {
        GoogleAccount {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: "Test User".into(),
            picture: None,
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            connected_at: Utc::now(),
            last_synced_at: None,
        }
    }

    fn scheduled_bot(bot_id: &str) -> ScheduledBot {
        ScheduledBot {
            bot_id: bot_id.to_string(),
            meeting_info: MeetingInfo {
                meeting_url: "https://zoom.us/j/1".into(),
                start_time: Utc::now(),
                duration_minutes: 30,
                platform: MeetingPlatform::Zoom,
                title: "Sync".into(),
                attendees: vec![],
            },
            scheduled_for: Utc::now(),
            status: "scheduled".into(),
            completed: None,
        }
    }

    fn completed_meeting(event_id: &str) -> CompletedMeeting {
        CompletedMeeting {
            meeting_id: event_id.to_string(),
            bot_id: "bot-1".into(),
            transcript: "A: hi".into(),
            media_url: String::new(),
            status: "completed".into(),
            completed_at: Utc::now(),
            duration_secs: 0,
            attendees: vec![Attendee {
                email: Some("a@example.com".into()),
                name: None,
                response_status: "accepted".into(),
            }],
            platform: MeetingPlatform::Zoom,
            meeting_url: "https://zoom.us/j/1".into(),
            title: "Sync".into(),
        }
    }

    #[tokio::test]
    async fn test_account_roundtrip() {
        let store = MemoryStore::new();
        store.upsert_account(account("u1")).await.unwrap();
        assert!(store.get_account("u1").await.unwrap().is_some());
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
        assert!(store.remove_account("u1").await.unwrap());
        assert!(!store.remove_account("u1").await.unwrap());
        assert!(store.get_account("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reauth_overwrites_account() {
        let store = MemoryStore::new();
        store.upsert_account(account("u1")).await.unwrap();
        let mut updated = account("u1");
        updated.access_token = "at2".into();
        store.upsert_account(updated).await.unwrap();
        let got = store.get_account("u1").await.unwrap().unwrap();
        assert_eq!(got.access_token, "at2");
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notetaker_defaults_to_disabled() {
        let store = MemoryStore::new();
        assert!(!store.notetaker_enabled("e1").await.unwrap());
        store.set_notetaker("e1", true).await.unwrap();
        assert!(store.notetaker_enabled("e1").await.unwrap());
        store.set_notetaker("e1", false).await.unwrap();
        assert!(!store.notetaker_enabled("e1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_event_for_bot() {
        let store = MemoryStore::new();
        store
            .insert_scheduled_bot("u1_0", scheduled_bot("bot-1"))
            .await
            .unwrap();
        assert_eq!(
            store.find_event_for_bot("bot-1").await.unwrap().as_deref(),
            Some("u1_0")
        );
        assert!(store.find_event_for_bot("bot-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_bot_completed() {
        let store = MemoryStore::new();
        store
            .insert_scheduled_bot("u1_0", scheduled_bot("bot-1"))
            .await
            .unwrap();
        let payload = CompletedBot {
            bot_id: "bot-1".into(),
            recording: json!({"id": "rec-1"}),
            meeting_url: None,
            start_time: None,
            end_time: None,
            media_url: None,
            transcript: "A: hi".into(),
        };
        assert!(store.mark_bot_completed("u1_0", payload.clone()).await.unwrap());
        let bot = store.get_scheduled_bot("u1_0").await.unwrap().unwrap();
        assert_eq!(bot.status, "completed");
        assert!(bot.completed.is_some());
        assert!(!store.mark_bot_completed("unknown", payload).await.unwrap());
    }

    #[tokio::test]
    async fn test_completed_meeting_inserted_once() {
        let store = MemoryStore::new();
        assert!(store
            .insert_completed_meeting(completed_meeting("u1_0"))
            .await
            .unwrap());
        let mut second = completed_meeting("u1_0");
        second.transcript = "different".into();
        assert!(!store.insert_completed_meeting(second).await.unwrap());
        let got = store.get_completed_meeting("u1_0").await.unwrap().unwrap();
        assert_eq!(got.transcript, "A: hi");
    }

    #[tokio::test]
    async fn test_set_transcript() {
        let store = MemoryStore::new();
        assert!(!store.set_transcript("u1_0", "edited").await.unwrap());
        store
            .insert_completed_meeting(completed_meeting("u1_0"))
            .await
            .unwrap();
        assert!(store.set_transcript("u1_0", "edited").await.unwrap());
        assert_eq!(
            store
                .get_completed_meeting("u1_0")
                .await
                .unwrap()
                .unwrap()
                .transcript,
            "edited"
        );
    }

    #[tokio::test]
    async fn test_managed_set_remove_once() {
        let store = MemoryStore::new();
        store.add_managed_bot("bot-1").await.unwrap();
        store.add_managed_bot("bot-1").await.unwrap();
        assert_eq!(store.managed_bot_ids().await.unwrap().len(), 1);
        assert!(store.remove_managed_bot("bot-1").await.unwrap());
        assert!(!store.remove_managed_bot("bot-1").await.unwrap());
        assert!(store.managed_bot_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_partial_update() {
        let store = MemoryStore::new();
        let defaults = store.settings().await.unwrap();
        assert_eq!(defaults.recall_join_before_minutes, 5);
        assert_eq!(defaults.default_platform, "zoom");

        let updated = store
            .update_settings(SettingsPatch {
                recall_join_before_minutes: Some(10),
                enable_notifications: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.recall_join_before_minutes, 10);
        assert!(!updated.enable_notifications);
        // untouched fields keep their values
        assert_eq!(updated.default_platform, "zoom");
        assert_eq!(updated.linkedin_prompt, defaults.linkedin_prompt);
    }
}
