use super::*;
use crate::domain::{Backlog, User, Workitem, WorkitemKey};
use chrono::{TimeZone, Utc};

const ALICE: &str = "alice@example.com";

fn start() -> TimestampUtc {
    TimestampUtc(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
}

fn key() -> WorkitemKey {
    WorkitemKey::new(ALICE, "b1", "w1")
}

/// One work item with a 25/5 minute interval started at `start()`.
fn working_tree() -> Tenant {
    let mut tree = Tenant::new();
    tree.insert_user(User::new(ALICE, "Alice", false, start()));
    tree.insert_backlog(Backlog::new(ALICE, "b1", "Today", start()))
        .unwrap();
    tree.insert_workitem(Workitem::new("w1", "Write report", ALICE, "b1", start()))
        .unwrap();
    let item = tree.workitem_mut(&key()).unwrap();
    item.add_pomodoros(1, 1500, 300, start());
    item.start().unwrap();
    item.pomodoro_mut(0).unwrap().start_work(start()).unwrap();
    tree
}

fn resting_tree() -> Tenant {
    let mut tree = working_tree();
    tree.workitem_mut(&key())
        .unwrap()
        .pomodoro_mut(0)
        .unwrap()
        .start_rest(start().plus_seconds(1500).unwrap())
        .unwrap();
    tree
}

fn tags(catch_ups: &[CatchUp]) -> Vec<&'static str> {
    catch_ups.iter().map(|c| c.kind.tag()).collect()
}

#[test]
fn nothing_to_do_without_running_intervals() {
    let tree = Tenant::new();
    assert!(plan(&tree, start().plus_seconds(86_400).unwrap(), 0).unwrap().is_empty());
}

#[test]
fn running_interval_within_its_time_is_left_alone() {
    let tree = working_tree();
    assert!(plan(&tree, start().plus_seconds(600).unwrap(), 0).unwrap().is_empty());
}

#[test]
fn overdue_work_starts_rest_at_the_planned_end() {
    let tree = working_tree();
    let catch_ups = plan(&tree, start().plus_seconds(1600).unwrap(), 0).unwrap();

    assert_eq!(tags(&catch_ups), vec!["StartRest"]);
    assert_eq!(catch_ups[0].when, start().plus_seconds(1500).unwrap());
    assert_eq!(catch_ups[0].owner, ALICE);
    assert_eq!(
        catch_ups[0].kind,
        StrategyKind::StartRest {
            workitem_uid: "w1".to_string(),
            rest_duration: 300,
        }
    );
}

#[test]
fn long_absence_plans_rest_and_finish() {
    let tree = working_tree();
    let catch_ups = plan(&tree, start().plus_seconds(7200).unwrap(), 0).unwrap();

    assert_eq!(tags(&catch_ups), vec!["StartRest", "FinishPomodoroInternal"]);
    assert_eq!(catch_ups[1].when, start().plus_seconds(1800).unwrap());
}

#[test]
fn overdue_rest_finishes() {
    let tree = resting_tree();
    let catch_ups = plan(&tree, start().plus_seconds(1900).unwrap(), 0).unwrap();
    assert_eq!(tags(&catch_ups), vec!["FinishPomodoroInternal"]);
    assert_eq!(catch_ups[0].when, start().plus_seconds(1800).unwrap());
}

#[test]
fn grace_period_delays_sealing() {
    let tree = working_tree();
    assert!(plan(&tree, start().plus_seconds(1505).unwrap(), 5).unwrap().is_empty());
    assert_eq!(tags(&plan(&tree, start().plus_seconds(1506).unwrap(), 5).unwrap()), vec!["StartRest"]);
}

#[test]
fn apply_counts_and_stops_at_first_failure() {
    let tree = working_tree();
    let catch_ups = plan(&tree, start().plus_seconds(7200).unwrap(), 0).unwrap();

    let mut seen = Vec::new();
    let applied = apply(catch_ups.clone(), |c| {
        seen.push(c.kind.tag());
        Ok(())
    })
    .unwrap();
    assert_eq!(applied, 2);
    assert_eq!(seen, vec!["StartRest", "FinishPomodoroInternal"]);

    let mut calls = 0;
    let err = apply(catch_ups, |_| {
        calls += 1;
        Err(LedgerError::storage("disk full"))
    })
    .unwrap_err();
    assert!(matches!(err, LedgerError::Storage { .. }));
    assert_eq!(calls, 1);
}
