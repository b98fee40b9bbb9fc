//! End-to-end poller tests against the mock bot API and in-memory store.
//!
//! These step reconcile cycles deterministically via `run_cycle` — the same
//! path the background loop and the manual poll endpoint use.

use serde_json::json;

use crate::testing::{sample_scheduled_bot, setup_poller, MockBotApi};
use crate::traits::StateStore;
use crate::types::MeetingPlatform;

#[tokio::test]
async fn completed_bot_is_promoted_exactly_once() {
    let harness = setup_poller();
    harness
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    harness
        .bots
        .set_transcript(
            "bot-1",
            json!([{"participant": {"name": "A"}, "words": [{"text": "hi"}]}]),
        )
        .await;

    let completed = harness.poller.run_cycle().await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].bot_id, "bot-1");

    // removed from the managed set exactly once
    assert!(harness.store.managed_bot_ids().await.unwrap().is_empty());

    // one completed-meeting record, carrying the scheduling-time metadata
    let meeting = harness
        .store
        .get_completed_meeting("acct_0")
        .await
        .unwrap()
        .expect("completed meeting stored");
    assert_eq!(meeting.transcript, "A: hi");
    assert_eq!(meeting.bot_id, "bot-1");
    assert_eq!(meeting.title, "Quarterly Review");
    assert_eq!(meeting.platform, MeetingPlatform::Zoom);
    assert_eq!(meeting.attendees.len(), 1);
    assert_eq!(meeting.duration_secs, 30 * 60);
    assert_eq!(meeting.media_url, "https://dl.example.com/v.mp4");

    // scheduled-bot record mutated in place
    let bot = harness
        .store
        .get_scheduled_bot("acct_0")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bot.status, "completed");
    assert!(bot.completed.is_some());
}

#[tokio::test]
async fn cycles_with_pending_bots_change_nothing() {
    let harness = setup_poller();
    harness
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", MockBotApi::pending_status())
        .await;

    for _ in 0..2 {
        let completed = harness.poller.run_cycle().await.unwrap();
        assert!(completed.is_empty());
    }

    assert_eq!(harness.store.managed_bot_ids().await.unwrap(), vec!["bot-1"]);
    assert!(harness
        .store
        .list_completed_meetings()
        .await
        .unwrap()
        .is_empty());
    let bot = harness
        .store
        .get_scheduled_bot("acct_0")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bot.status, "scheduled");
}

#[tokio::test]
async fn second_cycle_on_empty_managed_set_is_a_no_op() {
    let harness = setup_poller();
    harness
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    harness
        .bots
        .set_transcript(
            "bot-1",
            json!([{"participant": {"name": "A"}, "words": [{"text": "hi"}]}]),
        )
        .await;

    assert_eq!(harness.poller.run_cycle().await.unwrap().len(), 1);
    let transcript_before = harness
        .store
        .get_completed_meeting("acct_0")
        .await
        .unwrap()
        .unwrap()
        .transcript;
    let calls_after_first = harness.bots.status_call_count().await;

    // the managed set is now empty, so nothing is polled and nothing changes
    let completed = harness.poller.run_cycle().await.unwrap();
    assert!(completed.is_empty());
    assert_eq!(harness.bots.status_call_count().await, calls_after_first);
    assert_eq!(
        harness
            .store
            .get_completed_meeting("acct_0")
            .await
            .unwrap()
            .unwrap()
            .transcript,
        transcript_before
    );
    assert_eq!(harness.store.list_completed_meetings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn caption_and_segment_payloads_promote_identical_transcripts() {
    // caption-list payload
    let harness_a = setup_poller();
    harness_a
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness_a.store.add_managed_bot("bot-1").await.unwrap();
    harness_a
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    harness_a
        .bots
        .set_transcript(
            "bot-1",
            json!([{"participant": {"name": "A"}, "words": [{"text": "hi"}]}]),
        )
        .await;
    harness_a.poller.run_cycle().await.unwrap();

    // segments-dict payload with the same content
    let harness_b = setup_poller();
    harness_b
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness_b.store.add_managed_bot("bot-1").await.unwrap();
    harness_b
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    harness_b
        .bots
        .set_transcript("bot-1", json!({"segments": [{"speaker": "A", "text": "hi"}]}))
        .await;
    harness_b.poller.run_cycle().await.unwrap();

    let transcript_a = harness_a
        .store
        .get_completed_meeting("acct_0")
        .await
        .unwrap()
        .unwrap()
        .transcript;
    let transcript_b = harness_b
        .store
        .get_completed_meeting("acct_0")
        .await
        .unwrap()
        .unwrap()
        .transcript;
    assert_eq!(transcript_a, "A: hi");
    assert_eq!(transcript_a, transcript_b);
}

#[tokio::test]
async fn unmatched_bot_is_dropped_without_completed_record() {
    let harness = setup_poller();
    // managed bot with no scheduled-bot record to correlate against
    harness.store.add_managed_bot("bot-9").await.unwrap();
    harness
        .bots
        .set_status("bot-9", MockBotApi::recording_status())
        .await;
    harness
        .bots
        .set_transcript("bot-9", json!({"segments": [{"speaker": "A", "text": "hi"}]}))
        .await;

    let completed = harness.poller.run_cycle().await.unwrap();
    assert_eq!(completed.len(), 1);
    assert!(harness.store.managed_bot_ids().await.unwrap().is_empty());
    assert!(harness
        .store
        .list_completed_meetings()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_bot_is_evicted_from_managed_set() {
    let harness = setup_poller();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", json!({"recordings": [], "status": "failed"}))
        .await;

    let completed = harness.poller.run_cycle().await.unwrap();
    assert!(completed.is_empty());
    assert!(harness.store.managed_bot_ids().await.unwrap().is_empty());
    assert!(harness
        .store
        .list_completed_meetings()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn status_fetch_failure_keeps_bot_managed() {
    let harness = setup_poller();
    harness.store.add_managed_bot("bot-unknown").await.unwrap();
    // no scripted status — the mock answers 404

    let completed = harness.poller.run_cycle().await.unwrap();
    assert!(completed.is_empty());
    // the bot stays in the managed set and is retried next cycle
    assert_eq!(
        harness.store.managed_bot_ids().await.unwrap(),
        vec!["bot-unknown"]
    );
}

#[tokio::test]
async fn transcript_failure_still_promotes_with_empty_transcript() {
    let harness = setup_poller();
    harness
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    // no transcript scripted — fetch fails, completion proceeds

    let completed = harness.poller.run_cycle().await.unwrap();
    assert_eq!(completed.len(), 1);
    let meeting = harness
        .store
        .get_completed_meeting("acct_0")
        .await
        .unwrap()
        .unwrap();
    assert!(meeting.transcript.is_empty());
    assert_eq!(meeting.status, "completed");
}

#[tokio::test]
async fn telemetry_tracks_cycles_and_completions() {
    let harness = setup_poller();
    harness
        .store
        .insert_scheduled_bot("acct_0", sample_scheduled_bot("bot-1"))
        .await
        .unwrap();
    harness.store.add_managed_bot("bot-1").await.unwrap();
    harness
        .bots
        .set_status("bot-1", MockBotApi::recording_status())
        .await;
    harness
        .bots
        .set_transcript("bot-1", json!({"segments": [{"speaker": "A", "text": "hi"}]}))
        .await;

    harness.poller.run_cycle().await.unwrap();
    harness.poller.run_cycle().await.unwrap();

    let snapshot = harness.poller.telemetry().snapshot();
    assert_eq!(snapshot.cycles, 2);
    assert_eq!(snapshot.completed_total, 1);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(snapshot.last_success_at.is_some());
    assert!(snapshot.last_error.is_none());
}
