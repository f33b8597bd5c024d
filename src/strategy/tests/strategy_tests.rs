use super::*;
use crate::domain::{PomodoroState, ADMIN_USER, MAX_POMODOROS};
use crate::events::EventKind;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

const ALICE: &str = "alice@example.com";

struct TestSettings;

impl SettingsReader for TestSettings {
    fn username(&self) -> String {
        ALICE.to_string()
    }

    fn fullname(&self) -> String {
        "Alice".to_string()
    }

    fn default_work_duration(&self) -> u32 {
        1500
    }

    fn default_rest_duration(&self) -> u32 {
        300
    }

    fn auto_seal_after(&self) -> u32 {
        0
    }
}

fn start() -> TimestampUtc {
    TimestampUtc(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
}

/// A tree with Alice, driven strategy by strategy without a log.
struct Harness {
    tree: Tenant,
    emitter: EventEmitter,
    sequence: u64,
    seen: Arc<Mutex<Vec<EventKind>>>,
}

impl Harness {
    fn new() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut emitter = EventEmitter::new();
        emitter.on_any(move |e| sink.lock().unwrap().push(e.kind()));
        let mut h = Self {
            tree: Tenant::new(),
            emitter,
            sequence: 0,
            seen,
        };
        h.run_as(
            ADMIN_USER,
            StrategyKind::CreateUser {
                identity: ALICE.to_string(),
                name: "Alice".to_string(),
            },
        )
        .unwrap();
        h.clear();
        h
    }

    fn execute(&mut self, strategy: &Strategy) -> Result<Outcome, LedgerError> {
        let mut ctx = ExecutionContext {
            tree: &mut self.tree,
            emitter: &mut self.emitter,
            settings: &TestSettings,
        };
        strategy.execute(&mut ctx)
    }

    fn run_as_at(
        &mut self,
        actor: &str,
        kind: StrategyKind,
        when: TimestampUtc,
    ) -> Result<Outcome, LedgerError> {
        self.sequence += 1;
        let strategy = Strategy::new(self.sequence, when, actor, kind);
        self.execute(&strategy)
    }

    fn run_as(&mut self, actor: &str, kind: StrategyKind) -> Result<Outcome, LedgerError> {
        self.run_as_at(actor, kind, start())
    }

    fn run(&mut self, kind: StrategyKind) -> Result<Outcome, LedgerError> {
        self.run_as(ALICE, kind)
    }

    fn run_at(&mut self, kind: StrategyKind, when: TimestampUtc) -> Result<Outcome, LedgerError> {
        self.run_as_at(ALICE, kind, when)
    }

    fn seen(&self) -> Vec<EventKind> {
        self.seen.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }

    fn workitem(&self, uid: &str) -> &Workitem {
        self.tree.find_workitem(ALICE, uid).unwrap()
    }
}

fn backlog(uid: &str, name: &str) -> StrategyKind {
    StrategyKind::CreateBacklog {
        uid: uid.to_string(),
        name: name.to_string(),
    }
}

fn workitem(uid: &str, backlog_uid: &str, name: &str) -> StrategyKind {
    StrategyKind::CreateWorkitem {
        uid: uid.to_string(),
        backlog_uid: backlog_uid.to_string(),
        name: name.to_string(),
    }
}

fn add(uid: &str, count: u32) -> StrategyKind {
    StrategyKind::AddPomodoro {
        workitem_uid: uid.to_string(),
        count,
    }
}

fn start_work(uid: &str) -> StrategyKind {
    StrategyKind::StartWork {
        workitem_uid: uid.to_string(),
        work_duration: 0,
        rest_duration: 0,
    }
}

fn start_rest(uid: &str) -> StrategyKind {
    StrategyKind::StartRest {
        workitem_uid: uid.to_string(),
        rest_duration: 0,
    }
}

/// Alice with backlog b1 holding w11 (two intervals) and w12 (one interval).
fn planned() -> Harness {
    let mut h = Harness::new();
    h.run(backlog("b1", "Today")).unwrap();
    h.run(workitem("w11", "b1", "Write report")).unwrap();
    h.run(workitem("w12", "b1", "Review")).unwrap();
    h.run(add("w11", 2)).unwrap();
    h.run(add("w12", 1)).unwrap();
    h.clear();
    h
}

#[test]
fn new_workitem_is_planned_without_intervals() {
    let mut h = Harness::new();
    h.run(backlog("b1", "Today")).unwrap();
    h.run(workitem("w11", "b1", "Write report")).unwrap();

    let item = h.workitem("w11");
    assert!(item.is_planned());
    assert!(item.pomodoros().is_empty());
    assert!(!item.is_startable());
    assert_eq!(h.tree.backlog(ALICE, "b1").unwrap().workitem_uids(), ["w11"]);
}

#[test]
fn create_events_bracket_the_mutation() {
    let mut h = Harness::new();
    h.run(backlog("b1", "Today")).unwrap();
    assert_eq!(
        h.seen(),
        vec![EventKind::BeforeBacklogCreate, EventKind::AfterBacklogCreate]
    );
}

#[test]
fn duplicate_uids_are_rejected() {
    let mut h = Harness::new();
    h.run(backlog("b1", "Today")).unwrap();
    h.run(backlog("b2", "Later")).unwrap();
    h.run(workitem("w11", "b1", "Write report")).unwrap();

    let err = h.run(backlog("b1", "Again")).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists { entity: "Backlog", .. }));

    let err = h.run(workitem("w11", "b2", "Elsewhere")).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists { entity: "Workitem", .. }));
    assert!(h.tree.backlog(ALICE, "b2").unwrap().workitem_uids().is_empty());
}

#[test]
fn unknown_actor_is_not_found() {
    let mut h = Harness::new();
    let err = h.run_as("mallory@example.com", backlog("b1", "Today")).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "User", .. }));
}

#[test]
fn workitem_in_missing_backlog_is_not_found() {
    let mut h = Harness::new();
    let err = h.run(workitem("w11", "nope", "Write report")).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "Backlog", .. }));
    assert!(h.seen().is_empty());
}

#[test]
fn only_system_users_manage_users() {
    let mut h = Harness::new();
    let err = h
        .run(StrategyKind::CreateUser {
            identity: "bob@example.com".to_string(),
            name: "Bob".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));

    let err = h
        .run_as(
            ADMIN_USER,
            StrategyKind::DeleteUser {
                identity: ADMIN_USER.to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));

    h.run_as(
        ADMIN_USER,
        StrategyKind::RenameUser {
            identity: ALICE.to_string(),
            new_name: "Alice Liddell".to_string(),
        },
    )
    .unwrap();
    assert_eq!(h.tree.user(ALICE).unwrap().name(), "Alice Liddell");
}

#[test]
fn deleting_a_user_cascades_through_sub_strategies() {
    let mut h = planned();
    h.run(start_work("w11")).unwrap();
    h.clear();

    h.run_as(
        ADMIN_USER,
        StrategyKind::DeleteUser {
            identity: ALICE.to_string(),
        },
    )
    .unwrap();

    assert!(h.tree.user(ALICE).is_none());
    assert_eq!(h.tree.backlogs().count(), 0);
    assert_eq!(h.tree.workitems().count(), 0);

    let seen = h.seen();
    assert_eq!(seen.first(), Some(&EventKind::BeforeUserDelete));
    assert_eq!(seen.last(), Some(&EventKind::AfterUserDelete));
    let position = |kind| seen.iter().position(|k| *k == kind).unwrap();
    assert!(position(EventKind::BeforePomodoroComplete) < position(EventKind::AfterWorkitemDelete));
    assert!(position(EventKind::AfterWorkitemDelete) < position(EventKind::AfterBacklogDelete));
}

#[test]
fn renaming_to_the_same_name_emits_nothing() {
    let mut h = planned();
    h.run(StrategyKind::RenameWorkitem {
        uid: "w11".to_string(),
        new_name: "Write report".to_string(),
    })
    .unwrap();
    assert!(h.seen().is_empty());

    h.run(StrategyKind::RenameWorkitem {
        uid: "w11".to_string(),
        new_name: "Write summary".to_string(),
    })
    .unwrap();
    assert_eq!(h.workitem("w11").name(), "Write summary");
    assert_eq!(
        h.seen(),
        vec![EventKind::BeforeWorkitemRename, EventKind::AfterWorkitemRename]
    );
}

#[test]
fn add_and_remove_pomodoros() {
    let mut h = planned();
    assert_eq!(h.workitem("w11").pomodoros().len(), 2);
    assert_eq!(h.workitem("w11").pomodoros()[0].work_duration(), 1500);
    assert!(h.workitem("w11").is_startable());

    let err = h.run(add("w11", 0)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));

    let err = h
        .run(StrategyKind::RemovePomodoro {
            workitem_uid: "w11".to_string(),
            count: 3,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));
    assert_eq!(h.workitem("w11").pomodoros().len(), 2);

    h.run(StrategyKind::RemovePomodoro {
        workitem_uid: "w11".to_string(),
        count: 1,
    })
    .unwrap();
    assert_eq!(h.workitem("w11").pomodoros().len(), 1);
}

#[test]
fn pomodoro_count_is_capped_per_workitem() {
    let mut h = planned();
    let err = h.run(add("w11", u32::MAX)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));
    assert_eq!(h.workitem("w11").pomodoros().len(), 2);

    h.run(add("w11", (MAX_POMODOROS - 2) as u32)).unwrap();
    assert_eq!(h.workitem("w11").pomodoros().len(), MAX_POMODOROS);
    let err = h.run(add("w11", 1)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));
}

#[test]
fn start_work_starts_the_workitem_and_its_first_interval() {
    let mut h = planned();
    let outcome = h.run(start_work("w11")).unwrap();
    assert_eq!(outcome, Outcome::Done);

    let item = h.workitem("w11");
    assert!(item.is_running());
    let first = &item.pomodoros()[0];
    assert_eq!(first.state(), PomodoroState::Working);
    assert_eq!(first.planned_end_of_work(), Some(start().plus_seconds(1500).unwrap()));
    assert_eq!(first.planned_end_of_rest(), Some(start().plus_seconds(1800).unwrap()));
    assert_eq!(item.pomodoros()[1].state(), PomodoroState::New);

    assert_eq!(
        h.seen(),
        vec![
            EventKind::BeforeWorkitemStart,
            EventKind::AfterWorkitemStart,
            EventKind::BeforePomodoroWorkStart,
            EventKind::AfterPomodoroWorkStart,
        ]
    );
}

#[test]
fn start_work_overrides_durations_when_given() {
    let mut h = planned();
    h.run(StrategyKind::StartWork {
        workitem_uid: "w11".to_string(),
        work_duration: 600,
        rest_duration: 120,
    })
    .unwrap();
    let first = &h.workitem("w11").pomodoros()[0];
    assert_eq!(first.work_duration(), 600);
    assert_eq!(first.rest_duration(), 120);
}

#[test]
fn second_timer_asks_for_reconciliation_without_changes() {
    let mut h = planned();
    h.run(start_work("w11")).unwrap();
    h.clear();
    let before = h.tree.clone();

    let outcome = h.run(start_work("w12")).unwrap();
    assert_eq!(
        outcome,
        Outcome::AutoSeal {
            workitem_uid: "w11".to_string(),
            workitem_name: "Write report".to_string(),
        }
    );
    assert_eq!(h.tree, before);
    assert!(h.seen().is_empty());
}

#[test]
fn full_interval_cycle() {
    let mut h = planned();
    h.run(start_work("w12")).unwrap();
    h.run_at(start_rest("w12"), start().plus_seconds(1500).unwrap()).unwrap();
    let resting = &h.workitem("w12").pomodoros()[0];
    assert!(resting.is_resting());
    assert_eq!(resting.planned_end_of_rest(), Some(start().plus_seconds(1800).unwrap()));

    h.run_at(
        StrategyKind::FinishPomodoroInternal {
            workitem_uid: "w12".to_string(),
        },
        start().plus_seconds(1800).unwrap(),
    )
    .unwrap();
    let item = h.workitem("w12");
    assert!(item.pomodoros()[0].is_finished());
    assert!(item.is_running());
    assert!(!item.is_startable());
    assert_eq!(h.tree.running_count(), 0);
}

#[test]
fn start_rest_requires_a_working_interval() {
    let mut h = planned();
    let err = h.run(start_rest("w11")).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));

    h.run(start_work("w11")).unwrap();
    h.run(start_rest("w11")).unwrap();
    let err = h.run(start_rest("w11")).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[test]
fn legacy_completion_voids_or_ignores() {
    let mut h = planned();
    h.run(start_work("w11")).unwrap();
    h.clear();

    h.run(StrategyKind::CompletePomodoro {
        workitem_uid: "w11".to_string(),
        target: SealReason::Finished,
    })
    .unwrap();
    assert!(h.seen().is_empty());
    assert!(h.workitem("w11").pomodoros()[0].is_working());

    h.run(StrategyKind::CompletePomodoro {
        workitem_uid: "w11".to_string(),
        target: SealReason::Canceled,
    })
    .unwrap();
    assert!(h.workitem("w11").pomodoros()[0].is_canceled());
    assert_eq!(
        h.seen(),
        vec![EventKind::BeforePomodoroComplete, EventKind::AfterPomodoroComplete]
    );
}

#[test]
fn completing_a_running_workitem_voids_its_interval_first() {
    let mut h = planned();
    h.run(start_work("w11")).unwrap();
    h.clear();

    h.run(StrategyKind::CompleteWorkitem {
        uid: "w11".to_string(),
        target: SealReason::Finished,
    })
    .unwrap();

    let item = h.workitem("w11");
    assert!(item.is_sealed());
    assert_eq!(item.sealed_at(), Some(start()));
    assert!(item.pomodoros()[0].is_canceled());
    assert_eq!(
        h.seen(),
        vec![
            EventKind::BeforeWorkitemComplete,
            EventKind::BeforeMessageProcessed,
            EventKind::BeforePomodoroComplete,
            EventKind::AfterPomodoroComplete,
            EventKind::AfterMessageProcessed,
            EventKind::AfterWorkitemComplete,
        ]
    );
}

#[test]
fn sealed_workitems_refuse_further_changes() {
    let mut h = planned();
    h.run(StrategyKind::CompleteWorkitem {
        uid: "w11".to_string(),
        target: SealReason::Canceled,
    })
    .unwrap();

    let err = h
        .run(StrategyKind::CompleteWorkitem {
            uid: "w11".to_string(),
            target: SealReason::Finished,
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    assert!(matches!(
        h.run(add("w11", 1)).unwrap_err(),
        LedgerError::InvalidTransition { .. }
    ));
    assert!(matches!(
        h.run(start_work("w11")).unwrap_err(),
        LedgerError::InvalidTransition { .. }
    ));
}

#[test]
fn carry_reaches_the_creation_event() {
    let mut h = Harness::new();
    h.run(backlog("b1", "Today")).unwrap();

    let carried = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&carried);
    h.emitter.on(EventKind::AfterWorkitemCreate, move |e| {
        if let Event::AfterWorkitemCreate { carry, .. } = e {
            *sink.lock().unwrap() = carry.clone();
        }
    });
    let strategy = Strategy::new(9, start(), ALICE, workitem("w11", "b1", "Write report"))
        .with_carry(Some("row-4".to_string()));
    h.execute(&strategy).unwrap();

    assert_eq!(carried.lock().unwrap().as_deref(), Some("row-4"));
}

#[test]
fn params_round_trip_through_tags() {
    let kind = StrategyKind::StartWork {
        workitem_uid: "w11".to_string(),
        work_duration: 1500,
        rest_duration: 0,
    };
    assert_eq!(kind.params(), vec!["w11", "1500"]);
    assert_eq!(StrategyKind::from_params(kind.tag(), &kind.params()).unwrap(), kind);

    let err = StrategyKind::from_params("AddPomodoro", &["w11".to_string(), "two".to_string()])
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));
    let err = StrategyKind::from_params("Teleport", &[]).unwrap_err();
    assert!(matches!(err, LedgerError::Codec { .. }));
}
