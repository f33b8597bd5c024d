use super::*;
use chrono::{TimeZone, Utc};

fn when() -> TimestampUtc {
    TimestampUtc(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
}

fn item() -> Workitem {
    Workitem::new("w1", "Write report", "alice@example.com", "b1", when())
}

#[test]
fn new_workitem_is_planned_and_not_startable() {
    let w = item();
    assert!(w.is_planned());
    assert!(w.pomodoros().is_empty());
    assert!(!w.is_startable());
}

#[test]
fn adding_pomodoros_makes_it_startable() {
    let mut w = item();
    w.add_pomodoros(3, 1500, 300, when());
    assert_eq!(w.pomodoros().len(), 3);
    assert!(w.is_startable());
    assert!(!w.has_running_pomodoro());
}

#[test]
fn remove_takes_startable_pomodoros_from_the_tail() {
    let mut w = item();
    w.add_pomodoros(3, 1500, 300, when());
    w.pomodoro_mut(0).unwrap().start_work(when()).unwrap();

    w.remove_startable_pomodoros(2).unwrap();
    assert_eq!(w.pomodoros().len(), 1);
    assert!(w.pomodoros()[0].is_working());

    let err = w.remove_startable_pomodoros(1).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParameter { .. }));
    assert_eq!(w.pomodoros().len(), 1);
}

#[test]
fn running_pomodoro_reports_its_index() {
    let mut w = item();
    w.add_pomodoros(2, 1500, 300, when());
    w.pomodoro_mut(1).unwrap().start_work(when()).unwrap();
    let (index, p) = w.running_pomodoro().unwrap();
    assert_eq!(index, 1);
    assert!(p.is_working());
}

#[test]
fn sealing_is_terminal() {
    let mut w = item();
    w.start().unwrap();
    assert!(w.is_running());
    assert!(w.start().is_err());

    w.seal(SealReason::Finished, when()).unwrap();
    assert_eq!(w.state(), WorkitemState::Sealed(SealReason::Finished));
    assert_eq!(w.sealed_at(), Some(when()));
    assert!(w.seal(SealReason::Canceled, when()).is_err());
}

#[test]
fn sealed_workitem_is_not_startable() {
    let mut w = item();
    w.add_pomodoros(1, 1500, 300, when());
    w.seal(SealReason::Canceled, when()).unwrap();
    assert!(!w.is_startable());
}

#[test]
fn seal_reason_parses_known_targets_only() {
    assert_eq!("finished".parse::<SealReason>().unwrap(), SealReason::Finished);
    assert_eq!("canceled".parse::<SealReason>().unwrap(), SealReason::Canceled);
    assert!("done".parse::<SealReason>().is_err());
}
