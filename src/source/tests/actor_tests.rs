//! Tests for the ledger actor.

use super::*;
use crate::domain::{ManualClock, TimestampUtc};
use crate::events::EventKind;
use crate::source::MemoryLog;
use chrono::{TimeZone, Utc};
use ractor::Actor;
use tempfile::tempdir;

const ALICE: &str = "alice@example.com";

fn t0() -> TimestampUtc {
    TimestampUtc(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
}

fn config() -> LedgerConfig {
    let mut config = LedgerConfig::default_config();
    config.username = ALICE.to_string();
    config.fullname = "Alice".to_string();
    config.pomodoro.auto_seal_after = 0;
    config
}

fn memory_source(clock: &ManualClock) -> DynSource {
    let settings: Arc<dyn SettingsReader> = Arc::new(config());
    EventSource::new(
        Box::new(MemoryLog::new()) as Box<dyn StrategyLog>,
        settings,
        Arc::new(clock.clone()),
    )
}

async fn execute(
    actor: &ActorRef<LedgerMessage>,
    kind: StrategyKind,
) -> Result<Strategy, LedgerError> {
    let (tx, rx) = oneshot::channel();
    actor
        .send_message(LedgerMessage::Execute(
            Box::new(kind),
            ExecuteOptions::default(),
            tx,
        ))
        .expect("send failed");
    rx.await.expect("receive failed")
}

fn backlog() -> StrategyKind {
    StrategyKind::CreateBacklog {
        uid: "b1".to_string(),
        name: "Today".to_string(),
    }
}

#[tokio::test]
async fn test_actor_executes_and_publishes_tree() {
    let clock = ManualClock::new(t0());
    let (args, mut tree_rx, mut event_rx) = actor_args(memory_source(&clock));

    let (actor_ref, _handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");

    let stored = execute(&actor_ref, backlog()).await.expect("execute failed");
    assert_eq!(stored.sequence, 2);

    tree_rx.changed().await.expect("tree changed");
    assert!(tree_rx.borrow().backlog(ALICE, "b1").is_some());

    let mut kinds = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        kinds.push(event.kind());
    }
    assert!(kinds.contains(&EventKind::SourceMessagesProcessed));
    assert!(kinds.contains(&EventKind::AfterBacklogCreate));
    // Replay was muted
    assert!(!kinds.contains(&EventKind::AfterUserCreate));
}

#[tokio::test]
async fn test_actor_reports_validation_errors() {
    let clock = ManualClock::new(t0());
    let (args, _, _) = actor_args(memory_source(&clock));
    let (actor_ref, _handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");

    execute(&actor_ref, backlog()).await.expect("first execute");
    let err = execute(&actor_ref, backlog()).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists { .. }));

    let (tx, rx) = oneshot::channel();
    actor_ref
        .send_message(LedgerMessage::LastSequence(tx))
        .expect("send failed");
    assert_eq!(rx.await.expect("receive failed"), 2);
}

#[tokio::test]
async fn test_actor_auto_seal_on_request() {
    let clock = ManualClock::new(t0());
    let (args, _, _) = actor_args(memory_source(&clock));
    let (actor_ref, _handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");

    execute(&actor_ref, backlog()).await.unwrap();
    execute(
        &actor_ref,
        StrategyKind::CreateWorkitem {
            uid: "w1".to_string(),
            backlog_uid: "b1".to_string(),
            name: "Write report".to_string(),
        },
    )
    .await
    .unwrap();
    execute(
        &actor_ref,
        StrategyKind::AddPomodoro {
            workitem_uid: "w1".to_string(),
            count: 1,
        },
    )
    .await
    .unwrap();
    execute(
        &actor_ref,
        StrategyKind::StartWork {
            workitem_uid: "w1".to_string(),
            work_duration: 0,
            rest_duration: 0,
        },
    )
    .await
    .unwrap();

    clock.advance(3600);
    let (tx, rx) = oneshot::channel();
    actor_ref
        .send_message(LedgerMessage::AutoSeal(tx))
        .expect("send failed");
    assert_eq!(rx.await.expect("receive failed").unwrap(), 2);

    let (tx, rx) = oneshot::channel();
    actor_ref
        .send_message(LedgerMessage::GetTree(tx))
        .expect("send failed");
    let tree = rx.await.expect("receive failed");
    assert_eq!(tree.running_count(), 0);
}

#[tokio::test]
async fn test_actor_applies_remote_strategies() {
    let clock = ManualClock::new(t0());
    let (args, _, _) = actor_args(memory_source(&clock));
    let (actor_ref, _handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");

    let remote = Strategy::new(2, t0(), ALICE, backlog());
    for expected in [true, false] {
        let (tx, rx) = oneshot::channel();
        actor_ref
            .send_message(LedgerMessage::ApplyRemote(Box::new(remote.clone()), tx))
            .expect("send failed");
        assert_eq!(rx.await.expect("receive failed").unwrap(), expected);
    }
}

#[tokio::test]
async fn test_file_backed_actor_survives_restart() {
    let dir = tempdir().expect("temp dir");
    let mut config = config();
    config.source.data_file = Some(dir.path().join("ledger.txt"));
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));

    let (args, _, _) = create_actor_args(&config, Arc::clone(&clock)).expect("create args failed");
    let (actor_ref, handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");
    execute(&actor_ref, backlog()).await.expect("execute failed");
    actor_ref.stop(None);
    handle.await.expect("actor stopped");

    let (args, _, _) = create_actor_args(&config, clock).expect("create args failed");
    let (actor_ref, _handle) = LedgerActor::spawn(None, LedgerActor, args)
        .await
        .expect("actor spawn failed");
    let (tx, rx) = oneshot::channel();
    actor_ref
        .send_message(LedgerMessage::GetTree(tx))
        .expect("send failed");
    let tree = rx.await.expect("receive failed");
    assert_eq!(tree.backlog(ALICE, "b1").map(|b| b.name()), Some("Today"));
}

#[tokio::test]
async fn test_enabled_encryption_is_refused() {
    let mut config = config();
    config.encryption.enabled = true;
    let result = create_actor_args(&config, Arc::new(ManualClock::new(t0())));
    assert!(result.is_err());
}
