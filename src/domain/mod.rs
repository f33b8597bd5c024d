//! Domain model for the focus ledger.
//!
//! The tree (users, backlogs, work items, intervals) is only ever changed by
//! strategies; everything here exposes read access publicly and keeps mutators
//! crate-private.

pub mod errors;
pub mod pomodoro;
pub mod services;
pub mod tree;
pub mod types;
pub mod workitem;

pub use errors::LedgerError;
pub use pomodoro::{Pomodoro, PomodoroState};
pub use services::{Clock, ManualClock, SystemClock};
pub use tree::{Backlog, BacklogKey, Tenant, User, UserActivity, WorkitemKey};
pub use types::{generate_uid, generate_unique_name, TimestampUtc, ADMIN_NAME, ADMIN_USER};
pub use workitem::{SealReason, Workitem, WorkitemState, MAX_POMODOROS};
