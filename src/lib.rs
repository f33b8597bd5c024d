//! Event-sourced core for a pomodoro task tracker.
//!
//! Users own backlogs, backlogs own work items, and work items own timed
//! work/rest intervals. Every change is a [`strategy::Strategy`] appended to a
//! sequenced log; the in-memory tree is rebuilt by replaying that log.

pub mod auto_seal;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod events;
pub mod journal;
pub mod paths;
pub mod source;
pub mod strategy;

pub use config::{LedgerConfig, SettingsReader};
pub use domain::{LedgerError, Tenant, TimestampUtc};
pub use events::{Event, EventEmitter, EventKind};
pub use source::{EventSource, ExecuteOptions, FileLog, MemoryLog, PeerLog, StrategyLog};
pub use strategy::{Strategy, StrategyKind};
