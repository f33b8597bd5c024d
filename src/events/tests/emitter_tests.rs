use super::*;
use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<EventKind>>>, impl FnMut(&Event) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |e: &Event| sink.lock().unwrap().push(e.kind()))
}

#[test]
fn delivers_only_matching_kinds() {
    let mut emitter = EventEmitter::new();
    let (seen, cb) = recorder();
    emitter.on(EventKind::SourceMessagesProcessed, cb);

    emitter.emit(&Event::SourceMessagesRequested);
    emitter.emit(&Event::SourceMessagesProcessed);

    assert_eq!(*seen.lock().unwrap(), vec![EventKind::SourceMessagesProcessed]);
}

#[test]
fn wildcard_receives_everything_in_order() {
    let mut emitter = EventEmitter::new();
    let (seen, cb) = recorder();
    emitter.on_any(cb);

    emitter.emit(&Event::SourceMessagesRequested);
    emitter.emit(&Event::SourceMessagesProcessed);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventKind::SourceMessagesRequested,
            EventKind::SourceMessagesProcessed
        ]
    );
}

#[test]
fn once_fires_a_single_time() {
    let mut emitter = EventEmitter::new();
    let (seen, cb) = recorder();
    emitter.once(EventKind::SourceMessagesRequested, cb);

    emitter.emit(&Event::SourceMessagesRequested);
    emitter.emit(&Event::SourceMessagesRequested);

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(emitter.subscription_count(), 0);
}

#[test]
fn unsubscribe_by_id_and_by_kind() {
    let mut emitter = EventEmitter::new();
    let (seen, cb) = recorder();
    let id = emitter.on(EventKind::SourceMessagesRequested, cb);
    assert!(emitter.unsubscribe(id));
    assert!(!emitter.unsubscribe(id));

    let (_, a) = recorder();
    let (_, b) = recorder();
    let (_, c) = recorder();
    emitter.on(EventKind::SourceMessagesRequested, a);
    emitter.on_any(b);
    emitter.subscribe(
        EventFilter::Kinds(vec![EventKind::SourceMessagesProcessed]),
        false,
        c,
    );
    assert_eq!(emitter.unsubscribe_kind(EventKind::SourceMessagesRequested), 2);
    assert_eq!(emitter.subscription_count(), 1);

    emitter.emit(&Event::SourceMessagesRequested);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn muted_emitter_still_delivers_message_brackets() {
    let mut emitter = EventEmitter::new();
    let (seen, cb) = recorder();
    emitter.on_any(cb);
    emitter.mute();

    emitter.emit(&Event::SourceMessagesRequested);
    let strategy = crate::strategy::Strategy::new(
        1,
        crate::domain::TimestampUtc::now(),
        crate::domain::ADMIN_USER,
        crate::strategy::StrategyKind::DeleteUser {
            identity: "bob@example.com".to_string(),
        },
    );
    emitter.emit(&Event::BeforeMessageProcessed {
        strategy,
        auto: false,
    });
    emitter.unmute();
    emitter.emit(&Event::SourceMessagesProcessed);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventKind::BeforeMessageProcessed,
            EventKind::SourceMessagesProcessed
        ]
    );
}
