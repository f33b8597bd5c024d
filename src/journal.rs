//! Structured JSONL journal of ledger activity.
//!
//! Each line carries:
//! - Monotonic sequence numbers for ordering
//! - ISO 8601 timestamps with microsecond precision
//! - A run ID that increments each time the journal is reopened
//! - Structured event data in JSON format

use crate::events::{Event, EventEmitter, SubscriptionId};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct EventJournal {
    run_id: u64,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single journal entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct JournalEntry {
    /// Monotonic sequence number within the run
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds
    pub ts: String,
    pub run_id: u64,
    /// Component that emitted the entry
    pub component: String,
    pub event: Value,
}

impl EventJournal {
    /// Opens (or creates) the journal at `path` and starts a new run.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - The journal file cannot be opened
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let run_id = last_run_id(path) + 1;
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            run_id,
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path: path.to_path_buf(),
        })
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Writes one entry. Thread-safe; write failures are dropped.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = JournalEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            run_id: self.run_id,
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }

    pub fn log_event(&self, event: &Event) {
        self.log("Ledger", event);
    }

    /// Logs a failed command that never reached the log.
    pub fn log_rejected(&self, tag: &str, reason: &str) {
        self.log(
            "Ledger",
            serde_json::json!({
                "event": "StrategyRejected",
                "strategy": tag,
                "reason": reason
            }),
        );
    }

    /// Subscribes the journal to every event of `emitter`.
    pub fn attach(self: &Arc<Self>, emitter: &mut EventEmitter) -> SubscriptionId {
        let journal = Arc::clone(self);
        emitter.on_any(move |event| journal.log_event(event))
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

fn last_run_id(path: &Path) -> u64 {
    let Ok(file) = File::open(path) else {
        return 0;
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<JournalEntry>(&line).ok())
        .map(|entry| entry.run_id)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
