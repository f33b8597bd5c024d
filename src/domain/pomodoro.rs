//! A single work/rest interval.

use crate::domain::errors::LedgerError;
use crate::domain::types::TimestampUtc;
use serde::{Deserialize, Serialize};

/// Interval lifecycle: `new → working → resting → finished`, or `canceled` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroState {
    #[default]
    New,
    Working,
    Resting,
    Finished,
    Canceled,
}

impl PomodoroState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Working => "working",
            Self::Resting => "resting",
            Self::Finished => "finished",
            Self::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pomodoro {
    work_duration: u32,
    rest_duration: u32,
    state: PomodoroState,
    created_at: TimestampUtc,
    last_modified: TimestampUtc,
    work_started_at: Option<TimestampUtc>,
    rest_started_at: Option<TimestampUtc>,
    planned_end_of_work: Option<TimestampUtc>,
    planned_end_of_rest: Option<TimestampUtc>,
}

impl Pomodoro {
    pub(crate) fn new(work_duration: u32, rest_duration: u32, when: TimestampUtc) -> Self {
        Self {
            work_duration,
            rest_duration,
            state: PomodoroState::New,
            created_at: when,
            last_modified: when,
            work_started_at: None,
            rest_started_at: None,
            planned_end_of_work: None,
            planned_end_of_rest: None,
        }
    }

    pub fn state(&self) -> PomodoroState {
        self.state
    }

    /// Configured work duration in seconds.
    pub fn work_duration(&self) -> u32 {
        self.work_duration
    }

    /// Configured rest duration in seconds.
    pub fn rest_duration(&self) -> u32 {
        self.rest_duration
    }

    pub fn created_at(&self) -> TimestampUtc {
        self.created_at
    }

    pub fn last_modified(&self) -> TimestampUtc {
        self.last_modified
    }

    pub fn work_started_at(&self) -> Option<TimestampUtc> {
        self.work_started_at
    }

    pub fn rest_started_at(&self) -> Option<TimestampUtc> {
        self.rest_started_at
    }

    pub fn planned_end_of_work(&self) -> Option<TimestampUtc> {
        self.planned_end_of_work
    }

    pub fn planned_end_of_rest(&self) -> Option<TimestampUtc> {
        self.planned_end_of_rest
    }

    /// Not started yet, so it can be started or removed.
    pub fn is_startable(&self) -> bool {
        self.state == PomodoroState::New
    }

    pub fn is_working(&self) -> bool {
        self.state == PomodoroState::Working
    }

    pub fn is_resting(&self) -> bool {
        self.state == PomodoroState::Resting
    }

    /// The timer is ticking (working or resting).
    pub fn is_running(&self) -> bool {
        self.is_working() || self.is_resting()
    }

    pub fn is_finished(&self) -> bool {
        self.state == PomodoroState::Finished
    }

    pub fn is_canceled(&self) -> bool {
        self.state == PomodoroState::Canceled
    }

    pub fn is_sealed(&self) -> bool {
        self.is_finished() || self.is_canceled()
    }

    /// Seconds left in the current state, negative once the planned end has passed.
    pub fn remaining_time_in_current_state(&self, now: TimestampUtc) -> f64 {
        let end = match self.state {
            PomodoroState::Working => self.planned_end_of_work,
            PomodoroState::Resting => self.planned_end_of_rest,
            _ => None,
        };
        end.map_or(0.0, |end| now.seconds_until(end))
    }

    /// Seconds until the end of rest while the interval is running.
    pub fn total_remaining_time(&self, now: TimestampUtc) -> f64 {
        if !self.is_running() {
            return 0.0;
        }
        self.planned_end_of_rest
            .map_or(0.0, |end| now.seconds_until(end))
    }

    pub(crate) fn touch(&mut self, when: TimestampUtc) {
        self.last_modified = when;
    }

    pub(crate) fn update_work_duration(&mut self, seconds: u32) {
        self.work_duration = seconds;
    }

    pub(crate) fn update_rest_duration(&mut self, seconds: u32) {
        self.rest_duration = seconds;
    }

    pub(crate) fn start_work(&mut self, when: TimestampUtc) -> Result<(), LedgerError> {
        if self.state != PomodoroState::New {
            return Err(LedgerError::transition(format!(
                "cannot start work on a {} pomodoro",
                self.state.as_str()
            )));
        }
        let end_of_work = when.plus_seconds(self.work_duration)?;
        let end_of_rest = end_of_work.plus_seconds(self.rest_duration)?;
        self.state = PomodoroState::Working;
        self.work_started_at = Some(when);
        self.planned_end_of_work = Some(end_of_work);
        self.planned_end_of_rest = Some(end_of_rest);
        Ok(())
    }

    pub(crate) fn start_rest(&mut self, when: TimestampUtc) -> Result<(), LedgerError> {
        if self.state != PomodoroState::Working {
            return Err(LedgerError::transition(format!(
                "cannot start rest on a {} pomodoro",
                self.state.as_str()
            )));
        }
        let end_of_rest = when.plus_seconds(self.rest_duration)?;
        self.state = PomodoroState::Resting;
        self.rest_started_at = Some(when);
        self.planned_end_of_rest = Some(end_of_rest);
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<(), LedgerError> {
        if self.state != PomodoroState::Resting {
            return Err(LedgerError::transition(format!(
                "cannot finish a {} pomodoro",
                self.state.as_str()
            )));
        }
        self.state = PomodoroState::Finished;
        Ok(())
    }

    pub(crate) fn cancel(&mut self) -> Result<(), LedgerError> {
        if self.is_sealed() {
            return Err(LedgerError::transition(format!(
                "cannot cancel a {} pomodoro",
                self.state.as_str()
            )));
        }
        self.state = PomodoroState::Canceled;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/pomodoro_tests.rs"]
mod tests;
