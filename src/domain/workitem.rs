//! Work items and their sealing rules.

use crate::domain::errors::LedgerError;
use crate::domain::pomodoro::Pomodoro;
use crate::domain::types::TimestampUtc;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Upper bound on the intervals a single work item may hold.
pub const MAX_POMODOROS: usize = 1000;

/// Terminal outcome of a work item or an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealReason {
    Finished,
    Canceled,
}

impl SealReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Canceled => "canceled",
        }
    }
}

impl Display for SealReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SealReason {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finished" => Ok(Self::Finished),
            "canceled" => Ok(Self::Canceled),
            other => Err(LedgerError::parameter(format!(
                "target state must be \"finished\" or \"canceled\", got \"{}\"",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkitemState {
    Planned,
    Running,
    Sealed(SealReason),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workitem {
    uid: String,
    name: String,
    owner: String,
    backlog_uid: String,
    state: WorkitemState,
    created_at: TimestampUtc,
    last_modified: TimestampUtc,
    sealed_at: Option<TimestampUtc>,
    pomodoros: Vec<Pomodoro>,
}

impl Workitem {
    pub(crate) fn new(
        uid: &str,
        name: &str,
        owner: &str,
        backlog_uid: &str,
        when: TimestampUtc,
    ) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            backlog_uid: backlog_uid.to_string(),
            state: WorkitemState::Planned,
            created_at: when,
            last_modified: when,
            sealed_at: None,
            pomodoros: Vec::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn backlog_uid(&self) -> &str {
        &self.backlog_uid
    }

    pub fn state(&self) -> WorkitemState {
        self.state
    }

    pub fn created_at(&self) -> TimestampUtc {
        self.created_at
    }

    pub fn last_modified(&self) -> TimestampUtc {
        self.last_modified
    }

    pub fn sealed_at(&self) -> Option<TimestampUtc> {
        self.sealed_at
    }

    pub fn pomodoros(&self) -> &[Pomodoro] {
        &self.pomodoros
    }

    pub fn is_planned(&self) -> bool {
        self.state == WorkitemState::Planned
    }

    pub fn is_running(&self) -> bool {
        self.state == WorkitemState::Running
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.state, WorkitemState::Sealed(_))
    }

    /// Not sealed and at least one interval has not started yet.
    pub fn is_startable(&self) -> bool {
        !self.is_sealed() && self.pomodoros.iter().any(Pomodoro::is_startable)
    }

    /// Index and interval of the one currently working or resting, if any.
    pub fn running_pomodoro(&self) -> Option<(usize, &Pomodoro)> {
        self.pomodoros.iter().enumerate().find(|(_, p)| p.is_running())
    }

    pub fn has_running_pomodoro(&self) -> bool {
        self.running_pomodoro().is_some()
    }

    pub(crate) fn pomodoro_mut(&mut self, index: usize) -> Option<&mut Pomodoro> {
        self.pomodoros.get_mut(index)
    }

    pub(crate) fn touch(&mut self, when: TimestampUtc) {
        self.last_modified = when;
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn start(&mut self) -> Result<(), LedgerError> {
        if !self.is_planned() {
            return Err(LedgerError::transition(format!(
                "work item \"{}\" is not planned",
                self.name
            )));
        }
        self.state = WorkitemState::Running;
        Ok(())
    }

    pub(crate) fn seal(&mut self, reason: SealReason, when: TimestampUtc) -> Result<(), LedgerError> {
        if self.is_sealed() {
            return Err(LedgerError::transition(format!(
                "work item \"{}\" is already sealed",
                self.name
            )));
        }
        self.state = WorkitemState::Sealed(reason);
        self.sealed_at = Some(when);
        Ok(())
    }

    pub(crate) fn add_pomodoros(&mut self, count: u32, work: u32, rest: u32, when: TimestampUtc) {
        for _ in 0..count {
            self.pomodoros.push(Pomodoro::new(work, rest, when));
        }
    }

    /// Removes `count` not-yet-started intervals, starting from the tail.
    pub(crate) fn remove_startable_pomodoros(&mut self, count: u32) -> Result<(), LedgerError> {
        let victims: Vec<usize> = self
            .pomodoros
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, p)| p.is_startable())
            .map(|(i, _)| i)
            .take(count as usize)
            .collect();
        if victims.len() < count as usize {
            return Err(LedgerError::parameter(format!(
                "cannot remove {} pomodoros from \"{}\", only {} not started",
                count,
                self.name,
                victims.len()
            )));
        }
        // Indexes are descending, so earlier removals do not shift later ones.
        for index in victims {
            self.pomodoros.remove(index);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/workitem_tests.rs"]
mod tests;
