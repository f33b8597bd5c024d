//! Typed notifications raised around every state change.
//!
//! Each [`Event`] variant carries a fixed payload. [`EventKind`] is the payload-free
//! tag used for subscriptions.

pub mod emitter;

use crate::domain::{Backlog, Pomodoro, SealReason, User, Workitem};
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};

pub use emitter::{EventEmitter, EventFilter, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    SourceMessagesRequested,
    SourceMessagesProcessed,
    BeforeMessageProcessed,
    AfterMessageProcessed,
    BeforeUserCreate,
    AfterUserCreate,
    BeforeUserRename,
    AfterUserRename,
    BeforeUserDelete,
    AfterUserDelete,
    BeforeBacklogCreate,
    AfterBacklogCreate,
    BeforeBacklogRename,
    AfterBacklogRename,
    BeforeBacklogDelete,
    AfterBacklogDelete,
    BeforeWorkitemCreate,
    AfterWorkitemCreate,
    BeforeWorkitemRename,
    AfterWorkitemRename,
    BeforeWorkitemDelete,
    AfterWorkitemDelete,
    BeforeWorkitemStart,
    AfterWorkitemStart,
    BeforeWorkitemComplete,
    AfterWorkitemComplete,
    BeforePomodoroAdd,
    AfterPomodoroAdd,
    BeforePomodoroRemove,
    AfterPomodoroRemove,
    BeforePomodoroWorkStart,
    AfterPomodoroWorkStart,
    BeforePomodoroRestStart,
    AfterPomodoroRestStart,
    BeforePomodoroComplete,
    AfterPomodoroComplete,
}

impl EventKind {
    /// Message brackets are the only events delivered while the emitter is muted.
    pub fn is_message_bracket(&self) -> bool {
        matches!(
            self,
            Self::BeforeMessageProcessed | Self::AfterMessageProcessed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    SourceMessagesRequested,
    SourceMessagesProcessed,
    BeforeMessageProcessed { strategy: Strategy, auto: bool },
    AfterMessageProcessed { strategy: Strategy, auto: bool },

    BeforeUserCreate { identity: String, name: String },
    AfterUserCreate { user: User },
    BeforeUserRename { user: User, new_name: String },
    AfterUserRename { user: User, old_name: String },
    BeforeUserDelete { user: User },
    AfterUserDelete { user: User },

    BeforeBacklogCreate { owner: String, uid: String, name: String },
    AfterBacklogCreate { backlog: Backlog },
    BeforeBacklogRename { backlog: Backlog, new_name: String },
    AfterBacklogRename { backlog: Backlog, old_name: String },
    BeforeBacklogDelete { backlog: Backlog },
    AfterBacklogDelete { backlog: Backlog },

    BeforeWorkitemCreate { backlog: Backlog, uid: String, name: String },
    AfterWorkitemCreate { workitem: Workitem, carry: Option<String> },
    BeforeWorkitemRename { workitem: Workitem, new_name: String },
    AfterWorkitemRename { workitem: Workitem, old_name: String },
    BeforeWorkitemDelete { workitem: Workitem },
    AfterWorkitemDelete { workitem: Workitem },
    BeforeWorkitemStart { workitem: Workitem },
    AfterWorkitemStart { workitem: Workitem },
    BeforeWorkitemComplete { workitem: Workitem, target: SealReason },
    AfterWorkitemComplete { workitem: Workitem, target: SealReason },

    BeforePomodoroAdd { workitem: Workitem, count: u32 },
    AfterPomodoroAdd { workitem: Workitem, count: u32 },
    BeforePomodoroRemove { workitem: Workitem, count: u32 },
    AfterPomodoroRemove { workitem: Workitem, count: u32 },
    BeforePomodoroWorkStart { workitem: Workitem, pomodoro: Pomodoro, work_duration: u32 },
    AfterPomodoroWorkStart { workitem: Workitem, pomodoro: Pomodoro, work_duration: u32 },
    BeforePomodoroRestStart { workitem: Workitem, pomodoro: Pomodoro, rest_duration: u32 },
    AfterPomodoroRestStart { workitem: Workitem, pomodoro: Pomodoro, rest_duration: u32 },
    BeforePomodoroComplete { workitem: Workitem, pomodoro: Pomodoro, target: SealReason },
    AfterPomodoroComplete { workitem: Workitem, pomodoro: Pomodoro, target: SealReason },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SourceMessagesRequested => EventKind::SourceMessagesRequested,
            Self::SourceMessagesProcessed => EventKind::SourceMessagesProcessed,
            Self::BeforeMessageProcessed { .. } => EventKind::BeforeMessageProcessed,
            Self::AfterMessageProcessed { .. } => EventKind::AfterMessageProcessed,
            Self::BeforeUserCreate { .. } => EventKind::BeforeUserCreate,
            Self::AfterUserCreate { .. } => EventKind::AfterUserCreate,
            Self::BeforeUserRename { .. } => EventKind::BeforeUserRename,
            Self::AfterUserRename { .. } => EventKind::AfterUserRename,
            Self::BeforeUserDelete { .. } => EventKind::BeforeUserDelete,
            Self::AfterUserDelete { .. } => EventKind::AfterUserDelete,
            Self::BeforeBacklogCreate { .. } => EventKind::BeforeBacklogCreate,
            Self::AfterBacklogCreate { .. } => EventKind::AfterBacklogCreate,
            Self::BeforeBacklogRename { .. } => EventKind::BeforeBacklogRename,
            Self::AfterBacklogRename { .. } => EventKind::AfterBacklogRename,
            Self::BeforeBacklogDelete { .. } => EventKind::BeforeBacklogDelete,
            Self::AfterBacklogDelete { .. } => EventKind::AfterBacklogDelete,
            Self::BeforeWorkitemCreate { .. } => EventKind::BeforeWorkitemCreate,
            Self::AfterWorkitemCreate { .. } => EventKind::AfterWorkitemCreate,
            Self::BeforeWorkitemRename { .. } => EventKind::BeforeWorkitemRename,
            Self::AfterWorkitemRename { .. } => EventKind::AfterWorkitemRename,
            Self::BeforeWorkitemDelete { .. } => EventKind::BeforeWorkitemDelete,
            Self::AfterWorkitemDelete { .. } => EventKind::AfterWorkitemDelete,
            Self::BeforeWorkitemStart { .. } => EventKind::BeforeWorkitemStart,
            Self::AfterWorkitemStart { .. } => EventKind::AfterWorkitemStart,
            Self::BeforeWorkitemComplete { .. } => EventKind::BeforeWorkitemComplete,
            Self::AfterWorkitemComplete { .. } => EventKind::AfterWorkitemComplete,
            Self::BeforePomodoroAdd { .. } => EventKind::BeforePomodoroAdd,
            Self::AfterPomodoroAdd { .. } => EventKind::AfterPomodoroAdd,
            Self::BeforePomodoroRemove { .. } => EventKind::BeforePomodoroRemove,
            Self::AfterPomodoroRemove { .. } => EventKind::AfterPomodoroRemove,
            Self::BeforePomodoroWorkStart { .. } => EventKind::BeforePomodoroWorkStart,
            Self::AfterPomodoroWorkStart { .. } => EventKind::AfterPomodoroWorkStart,
            Self::BeforePomodoroRestStart { .. } => EventKind::BeforePomodoroRestStart,
            Self::AfterPomodoroRestStart { .. } => EventKind::AfterPomodoroRestStart,
            Self::BeforePomodoroComplete { .. } => EventKind::BeforePomodoroComplete,
            Self::AfterPomodoroComplete { .. } => EventKind::AfterPomodoroComplete,
        }
    }
}
