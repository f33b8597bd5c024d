//! Error types for the ledger core.

use std::fmt::{Display, Formatter};

/// Errors raised while executing, sequencing, persisting or decoding strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// A user, backlog or work item referenced by a strategy does not exist.
    NotFound { entity: &'static str, uid: String },
    /// A create strategy targets a UID already present in its keyspace.
    AlreadyExists { entity: &'static str, uid: String },
    /// The entity is in a state that does not allow the requested transition.
    InvalidTransition { message: String },
    /// A strategy parameter could not be interpreted.
    InvalidParameter { message: String },
    /// The acting user is not allowed to issue the strategy.
    Unauthorized { message: String },
    /// A strategy arrived out of sequence.
    Sequence { expected: u64, received: u64 },
    /// A second interval is still running after reconciliation.
    ConcurrentTimer { workitem: String },
    /// The event source stopped accepting strategies after a fatal failure.
    Halted { reason: String },
    /// Storage/persistence failure.
    Storage { message: String },
    /// A log line could not be encoded or decoded.
    Codec { message: String },
}

impl LedgerError {
    pub(crate) fn not_found(entity: &'static str, uid: &str) -> Self {
        Self::NotFound {
            entity,
            uid: uid.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, uid: &str) -> Self {
        Self::AlreadyExists {
            entity,
            uid: uid.to_string(),
        }
    }

    pub(crate) fn transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }

    pub(crate) fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub(crate) fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub(crate) fn storage(err: impl Display) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }

    /// Validation failures are raised by strategies and never persisted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyExists { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidParameter { .. }
                | Self::Unauthorized { .. }
        )
    }

    /// Fatal failures stop the event source until it is repaired externally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Sequence { .. } | Self::Halted { .. })
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, uid } => write!(f, "{} \"{}\" not found", entity, uid),
            Self::AlreadyExists { entity, uid } => {
                write!(f, "{} \"{}\" already exists", entity, uid)
            }
            Self::InvalidTransition { message } => write!(f, "invalid transition: {}", message),
            Self::InvalidParameter { message } => write!(f, "invalid parameter: {}", message),
            Self::Unauthorized { message } => write!(f, "unauthorized: {}", message),
            Self::Sequence { expected, received } => write!(
                f,
                "strategies must go in sequence: expected {}, received {}",
                expected, received
            ),
            Self::ConcurrentTimer { workitem } => {
                write!(f, "there is another running pomodoro in \"{}\"", workitem)
            }
            Self::Halted { reason } => write!(f, "event source halted: {}", reason),
            Self::Storage { message } => write!(f, "storage failure: {}", message),
            Self::Codec { message } => write!(f, "codec failure: {}", message),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}
