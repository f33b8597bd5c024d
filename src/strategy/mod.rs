//! Strategies: the persisted commands that are the only way to change the tree.
//!
//! A strategy is validated and applied in one step by [`Strategy::execute`]. It
//! either succeeds, emitting its before/after events around the mutation, or fails
//! with a validation error before anything is persisted.

pub mod codec;

mod backlog;
mod pomodoro;
mod user;
mod workitem;

use crate::config::SettingsReader;
use crate::domain::{
    Backlog, LedgerError, Pomodoro, SealReason, Tenant, TimestampUtc, User, Workitem, WorkitemKey,
};
use crate::events::{Event, EventEmitter};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The closed set of strategy types, with their typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrategyKind {
    CreateUser { identity: String, name: String },
    RenameUser { identity: String, new_name: String },
    DeleteUser { identity: String },
    CreateBacklog { uid: String, name: String },
    RenameBacklog { uid: String, new_name: String },
    DeleteBacklog { uid: String },
    CreateWorkitem { uid: String, backlog_uid: String, name: String },
    RenameWorkitem { uid: String, new_name: String },
    DeleteWorkitem { uid: String },
    CompleteWorkitem { uid: String, target: SealReason },
    AddPomodoro { workitem_uid: String, count: u32 },
    RemovePomodoro { workitem_uid: String, count: u32 },
    /// Zero durations keep the interval's planned values.
    StartWork { workitem_uid: String, work_duration: u32, rest_duration: u32 },
    StartRest { workitem_uid: String, rest_duration: u32 },
    /// Legacy form: `canceled` voids the running interval, `finished` does nothing.
    CompletePomodoro { workitem_uid: String, target: SealReason },
    VoidPomodoro { workitem_uid: String },
    /// Only issued by reconciliation, never by users.
    FinishPomodoroInternal { workitem_uid: String },
}

impl StrategyKind {
    /// Name written to the log line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CreateUser { .. } => "CreateUser",
            Self::RenameUser { .. } => "RenameUser",
            Self::DeleteUser { .. } => "DeleteUser",
            Self::CreateBacklog { .. } => "CreateBacklog",
            Self::RenameBacklog { .. } => "RenameBacklog",
            Self::DeleteBacklog { .. } => "DeleteBacklog",
            Self::CreateWorkitem { .. } => "CreateWorkitem",
            Self::RenameWorkitem { .. } => "RenameWorkitem",
            Self::DeleteWorkitem { .. } => "DeleteWorkitem",
            Self::CompleteWorkitem { .. } => "CompleteWorkitem",
            Self::AddPomodoro { .. } => "AddPomodoro",
            Self::RemovePomodoro { .. } => "RemovePomodoro",
            Self::StartWork { .. } => "StartWork",
            Self::StartRest { .. } => "StartRest",
            Self::CompletePomodoro { .. } => "CompletePomodoro",
            Self::VoidPomodoro { .. } => "VoidPomodoro",
            Self::FinishPomodoroInternal { .. } => "FinishPomodoroInternal",
        }
    }

    /// Positional string parameters, in log order.
    pub fn params(&self) -> Vec<String> {
        match self {
            Self::CreateUser { identity, name } => vec![identity.clone(), name.clone()],
            Self::RenameUser { identity, new_name } => vec![identity.clone(), new_name.clone()],
            Self::DeleteUser { identity } => vec![identity.clone()],
            Self::CreateBacklog { uid, name } => vec![uid.clone(), name.clone()],
            Self::RenameBacklog { uid, new_name } | Self::RenameWorkitem { uid, new_name } => {
                vec![uid.clone(), new_name.clone()]
            }
            Self::DeleteBacklog { uid } | Self::DeleteWorkitem { uid } => vec![uid.clone()],
            Self::CreateWorkitem {
                uid,
                backlog_uid,
                name,
            } => vec![uid.clone(), backlog_uid.clone(), name.clone()],
            Self::CompleteWorkitem { uid, target } => vec![uid.clone(), target.to_string()],
            Self::AddPomodoro {
                workitem_uid,
                count,
            }
            | Self::RemovePomodoro {
                workitem_uid,
                count,
            } => vec![workitem_uid.clone(), count.to_string()],
            Self::StartWork {
                workitem_uid,
                work_duration,
                rest_duration,
            } => {
                let mut params = vec![workitem_uid.clone(), work_duration.to_string()];
                if *rest_duration != 0 {
                    params.push(rest_duration.to_string());
                }
                params
            }
            Self::StartRest {
                workitem_uid,
                rest_duration,
            } => vec![workitem_uid.clone(), rest_duration.to_string()],
            Self::CompletePomodoro {
                workitem_uid,
                target,
            } => vec![workitem_uid.clone(), target.to_string()],
            Self::VoidPomodoro { workitem_uid } | Self::FinishPomodoroInternal { workitem_uid } => {
                vec![workitem_uid.clone()]
            }
        }
    }

    /// Rebuilds a strategy kind from its log tag and positional parameters.
    pub fn from_params(tag: &str, params: &[String]) -> Result<Self, LedgerError> {
        let p = Params(params);
        let kind = match tag {
            "CreateUser" => Self::CreateUser {
                identity: p.required(0, "user identity")?,
                name: p.text(1),
            },
            "RenameUser" => Self::RenameUser {
                identity: p.required(0, "user identity")?,
                new_name: p.text(1),
            },
            "DeleteUser" => Self::DeleteUser {
                identity: p.required(0, "user identity")?,
            },
            "CreateBacklog" => Self::CreateBacklog {
                uid: p.required(0, "backlog UID")?,
                name: p.text(1),
            },
            "RenameBacklog" => Self::RenameBacklog {
                uid: p.required(0, "backlog UID")?,
                new_name: p.text(1),
            },
            "DeleteBacklog" => Self::DeleteBacklog {
                uid: p.required(0, "backlog UID")?,
            },
            "CreateWorkitem" => Self::CreateWorkitem {
                uid: p.required(0, "work item UID")?,
                backlog_uid: p.required(1, "backlog UID")?,
                name: p.text(2),
            },
            "RenameWorkitem" => Self::RenameWorkitem {
                uid: p.required(0, "work item UID")?,
                new_name: p.text(1),
            },
            "DeleteWorkitem" => Self::DeleteWorkitem {
                uid: p.required(0, "work item UID")?,
            },
            "CompleteWorkitem" => Self::CompleteWorkitem {
                uid: p.required(0, "work item UID")?,
                target: p.required(1, "target state")?.parse()?,
            },
            "AddPomodoro" => Self::AddPomodoro {
                workitem_uid: p.required(0, "work item UID")?,
                count: p.number(1, "pomodoro count")?,
            },
            "RemovePomodoro" => Self::RemovePomodoro {
                workitem_uid: p.required(0, "work item UID")?,
                count: p.number(1, "pomodoro count")?,
            },
            "StartWork" => Self::StartWork {
                workitem_uid: p.required(0, "work item UID")?,
                work_duration: p.optional_number(1, "work duration")?,
                rest_duration: p.optional_number(2, "rest duration")?,
            },
            "StartRest" => Self::StartRest {
                workitem_uid: p.required(0, "work item UID")?,
                rest_duration: p.optional_number(1, "rest duration")?,
            },
            "CompletePomodoro" => Self::CompletePomodoro {
                workitem_uid: p.required(0, "work item UID")?,
                target: p.required(1, "target state")?.parse()?,
            },
            "VoidPomodoro" => Self::VoidPomodoro {
                workitem_uid: p.required(0, "work item UID")?,
            },
            "FinishPomodoroInternal" => Self::FinishPomodoroInternal {
                workitem_uid: p.required(0, "work item UID")?,
            },
            other => return Err(LedgerError::codec(format!("unknown strategy \"{}\"", other))),
        };
        Ok(kind)
    }
}

struct Params<'a>(&'a [String]);

impl Params<'_> {
    fn text(&self, index: usize) -> String {
        self.0.get(index).cloned().unwrap_or_default()
    }

    fn required(&self, index: usize, what: &str) -> Result<String, LedgerError> {
        match self.0.get(index) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(LedgerError::parameter(format!("missing {}", what))),
        }
    }

    fn number(&self, index: usize, what: &str) -> Result<u32, LedgerError> {
        let raw = self.required(index, what)?;
        raw.trim()
            .parse()
            .map_err(|_| LedgerError::parameter(format!("{} must be a whole number, got \"{}\"", what, raw)))
    }

    /// Absent or empty means zero.
    fn optional_number(&self, index: usize, what: &str) -> Result<u32, LedgerError> {
        match self.0.get(index) {
            Some(value) if !value.is_empty() => self.number(index, what),
            _ => Ok(0),
        }
    }
}

/// A sequenced, dated, attributed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub sequence: u64,
    pub when: TimestampUtc,
    pub actor: String,
    pub kind: StrategyKind,
    /// Opaque value handed to the creation event; never persisted.
    #[serde(skip)]
    pub carry: Option<String>,
}

/// Result of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The strategy needs reconciliation first because another interval is running.
    AutoSeal {
        workitem_uid: String,
        workitem_name: String,
    },
}

/// What a strategy may touch while executing.
pub struct ExecutionContext<'a> {
    pub tree: &'a mut Tenant,
    pub emitter: &'a mut EventEmitter,
    pub settings: &'a dyn SettingsReader,
}

impl ExecutionContext<'_> {
    fn emit(&mut self, event: Event) {
        self.emitter.emit(&event);
    }
}

impl Strategy {
    pub fn new(sequence: u64, when: TimestampUtc, actor: &str, kind: StrategyKind) -> Self {
        Self {
            sequence,
            when,
            actor: actor.to_string(),
            kind,
            carry: None,
        }
    }

    pub fn with_carry(mut self, carry: Option<String>) -> Self {
        self.carry = carry;
        self
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn params(&self) -> Vec<String> {
        self.kind.params()
    }

    /// Validates and applies the strategy against the tree.
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Outcome, LedgerError> {
        find_user(ctx.tree, &self.actor)?;
        match &self.kind {
            StrategyKind::CreateUser { identity, name } => user::create(self, ctx, identity, name),
            StrategyKind::RenameUser { identity, new_name } => {
                user::rename(self, ctx, identity, new_name)
            }
            StrategyKind::DeleteUser { identity } => user::delete(self, ctx, identity),
            StrategyKind::CreateBacklog { uid, name } => backlog::create(self, ctx, uid, name),
            StrategyKind::RenameBacklog { uid, new_name } => {
                backlog::rename(self, ctx, uid, new_name)
            }
            StrategyKind::DeleteBacklog { uid } => backlog::delete(self, ctx, uid),
            StrategyKind::CreateWorkitem {
                uid,
                backlog_uid,
                name,
            } => workitem::create(self, ctx, uid, backlog_uid, name),
            StrategyKind::RenameWorkitem { uid, new_name } => {
                workitem::rename(self, ctx, uid, new_name)
            }
            StrategyKind::DeleteWorkitem { uid } => workitem::delete(self, ctx, uid),
            StrategyKind::CompleteWorkitem { uid, target } => {
                workitem::complete(self, ctx, uid, *target)
            }
            StrategyKind::AddPomodoro {
                workitem_uid,
                count,
            } => pomodoro::add(self, ctx, workitem_uid, *count),
            StrategyKind::RemovePomodoro {
                workitem_uid,
                count,
            } => pomodoro::remove(self, ctx, workitem_uid, *count),
            StrategyKind::StartWork {
                workitem_uid,
                work_duration,
                rest_duration,
            } => pomodoro::start_work(self, ctx, workitem_uid, *work_duration, *rest_duration),
            StrategyKind::StartRest {
                workitem_uid,
                rest_duration,
            } => pomodoro::start_rest(self, ctx, workitem_uid, *rest_duration),
            StrategyKind::CompletePomodoro {
                workitem_uid,
                target,
            } => pomodoro::complete(self, ctx, workitem_uid, *target),
            StrategyKind::VoidPomodoro { workitem_uid } => pomodoro::void(self, ctx, workitem_uid),
            StrategyKind::FinishPomodoroInternal { workitem_uid } => {
                pomodoro::finish(self, ctx, workitem_uid)
            }
        }
    }

    /// Runs a sub-strategy with the same sequence and date, bracketed as automatic.
    fn execute_another(
        &self,
        ctx: &mut ExecutionContext<'_>,
        kind: StrategyKind,
    ) -> Result<Outcome, LedgerError> {
        self.execute_another_as(ctx, &self.actor, kind)
    }

    fn execute_another_as(
        &self,
        ctx: &mut ExecutionContext<'_>,
        actor: &str,
        kind: StrategyKind,
    ) -> Result<Outcome, LedgerError> {
        let sub = Strategy::new(self.sequence, self.when, actor, kind);
        ctx.emit(Event::BeforeMessageProcessed {
            strategy: sub.clone(),
            auto: true,
        });
        let outcome = sub.execute(ctx)?;
        ctx.emit(Event::AfterMessageProcessed {
            strategy: sub,
            auto: true,
        });
        Ok(outcome)
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&codec::encode(self))
    }
}

fn find_user<'t>(tree: &'t Tenant, identity: &str) -> Result<&'t User, LedgerError> {
    tree.user(identity)
        .ok_or_else(|| LedgerError::not_found("User", identity))
}

fn find_backlog<'t>(tree: &'t Tenant, owner: &str, uid: &str) -> Result<&'t Backlog, LedgerError> {
    tree.backlog(owner, uid)
        .ok_or_else(|| LedgerError::not_found("Backlog", uid))
}

fn find_workitem(tree: &Tenant, owner: &str, uid: &str) -> Result<(WorkitemKey, Workitem), LedgerError> {
    let key = tree
        .find_workitem_key(owner, uid)
        .ok_or_else(|| LedgerError::not_found("Workitem", uid))?;
    let workitem = snapshot_workitem(tree, &key)?;
    Ok((key, workitem))
}

fn snapshot_workitem(tree: &Tenant, key: &WorkitemKey) -> Result<Workitem, LedgerError> {
    tree.workitem(key)
        .cloned()
        .ok_or_else(|| LedgerError::not_found("Workitem", &key.uid))
}

fn pomodoro_mut<'t>(
    tree: &'t mut Tenant,
    key: &WorkitemKey,
    index: usize,
) -> Result<&'t mut Pomodoro, LedgerError> {
    tree.workitem_mut(key)?
        .pomodoro_mut(index)
        .ok_or_else(|| LedgerError::not_found("Pomodoro", &key.uid))
}

#[cfg(test)]
#[path = "tests/strategy_tests.rs"]
mod tests;
