//! Non-durable log for tests and throwaway sessions.

use super::StrategyLog;
use crate::domain::LedgerError;
use crate::strategy::{codec, Strategy};

/// Keeps encoded lines in memory. Starts empty unless seeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    lines: Vec<String>,
    fail_appends: bool,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the log with existing history, e.g. to replay another source's strategies.
    pub fn from_strategies<'a>(strategies: impl IntoIterator<Item = &'a Strategy>) -> Self {
        Self {
            lines: strategies.into_iter().map(codec::encode).collect(),
            fail_appends: false,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Makes every following append fail, to exercise storage errors.
    pub fn set_fail_appends(&mut self, fail: bool) {
        self.fail_appends = fail;
    }
}

impl StrategyLog for MemoryLog {
    fn name(&self) -> &'static str {
        "Memory"
    }

    fn load(&mut self) -> Result<Vec<Strategy>, LedgerError> {
        self.lines.iter().map(|line| codec::decode(line)).collect()
    }

    fn append(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError> {
        if self.fail_appends {
            return Err(LedgerError::storage("memory log is refusing appends"));
        }
        self.lines.extend(strategies.iter().map(codec::encode));
        Ok(())
    }
}
