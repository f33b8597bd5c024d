//! Strategy log that lives on a remote peer.
//!
//! The transport is behind [`PeerConnection`]; the log only speaks encoded lines.
//! Delivery is at-least-once, so repeated lines for an already seen sequence
//! number are dropped while loading; a different line reusing one is an error.

use super::StrategyLog;
use crate::domain::LedgerError;
use crate::strategy::{codec, Strategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub trait PeerConnection: Send {
    /// Full history as encoded lines, oldest first.
    fn fetch_history(&mut self) -> Result<Vec<String>, LedgerError>;

    /// Ships one encoded line to the peer.
    fn send(&mut self, line: &str) -> Result<(), LedgerError>;
}

pub struct PeerLog<C: PeerConnection> {
    connection: C,
}

impl<C: PeerConnection> PeerLog<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }
}

impl<C: PeerConnection> StrategyLog for PeerLog<C> {
    fn name(&self) -> &'static str {
        "Peer"
    }

    fn load(&mut self) -> Result<Vec<Strategy>, LedgerError> {
        let mut strategies: Vec<Strategy> = Vec::new();
        let mut seen: HashMap<u64, usize> = HashMap::new();
        for line in self.connection.fetch_history()? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let strategy = codec::decode(trimmed)?;
            let last = strategies.last().map_or(0, |s| s.sequence);
            if let Some(&index) = seen.get(&strategy.sequence) {
                if strategies[index] == strategy {
                    tracing::debug!(sequence = strategy.sequence, "dropping redelivered strategy");
                    continue;
                }
                return Err(LedgerError::Sequence {
                    expected: last + 1,
                    received: strategy.sequence,
                });
            }
            if strategy.sequence < last {
                return Err(LedgerError::Sequence {
                    expected: last + 1,
                    received: strategy.sequence,
                });
            }
            seen.insert(strategy.sequence, strategies.len());
            strategies.push(strategy);
        }
        Ok(strategies)
    }

    fn append(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError> {
        for strategy in strategies {
            self.connection.send(&codec::encode(strategy))?;
        }
        Ok(())
    }
}

/// In-process peer: every connection cloned from the same loopback shares one
/// history. Useful for tests and for wiring two sources together.
#[derive(Debug, Clone, Default)]
pub struct LoopbackConnection {
    history: Arc<Mutex<Vec<String>>>,
    offline: Arc<Mutex<bool>>,
}

impl LoopbackConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded lines the peer has received so far.
    pub fn history(&self) -> Vec<String> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines after the first `seen`, decoded, for feeding another source.
    pub fn strategies_since(&self, seen: usize) -> Result<Vec<Strategy>, LedgerError> {
        self.history()
            .iter()
            .skip(seen)
            .map(|line| codec::decode(line))
            .collect()
    }

    /// Simulates losing the connection.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        let offline = self.offline.lock().map(|flag| *flag).unwrap_or(true);
        if offline {
            return Err(LedgerError::storage("peer is not reachable"));
        }
        Ok(())
    }
}

impl PeerConnection for LoopbackConnection {
    fn fetch_history(&mut self) -> Result<Vec<String>, LedgerError> {
        self.check_online()?;
        Ok(self.history())
    }

    fn send(&mut self, line: &str) -> Result<(), LedgerError> {
        self.check_online()?;
        self.history
            .lock()
            .map_err(|_| LedgerError::storage("peer history lock poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/peer_tests.rs"]
mod tests;
