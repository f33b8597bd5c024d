//! The event source: sequences strategies, persists them, and replays them on start.
//!
//! Storage is abstracted behind [`StrategyLog`]; the in-memory, file and peer
//! variants only differ in where lines go. Everything else (sequencing,
//! rollback, reconciliation, event brackets) lives in [`EventSource`].

pub mod actor;
pub mod file;
pub mod memory;
pub mod peer;

use crate::auto_seal;
use crate::config::SettingsReader;
use crate::domain::{
    Backlog, Clock, LedgerError, Pomodoro, Tenant, TimestampUtc, User, Workitem, ADMIN_USER,
};
use crate::events::{Event, EventEmitter, EventKind, SubscriptionId};
use crate::strategy::{ExecutionContext, Outcome, Strategy, StrategyKind};
use std::sync::Arc;

pub use file::FileLog;
pub use memory::MemoryLog;
pub use peer::{LoopbackConnection, PeerConnection, PeerLog};

/// Durable (or not) ordered storage of strategies.
pub trait StrategyLog: Send {
    fn name(&self) -> &'static str;

    /// Reads every stored strategy in order.
    fn load(&mut self) -> Result<Vec<Strategy>, LedgerError>;

    /// Appends strategies atomically: either all are stored or none.
    fn append(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError>;
}

impl<T: StrategyLog + ?Sized> StrategyLog for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load(&mut self) -> Result<Vec<Strategy>, LedgerError> {
        (**self).load()
    }

    fn append(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError> {
        (**self).append(strategies)
    }
}

/// Options for a single local execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Append to the log on success.
    pub persist: bool,
    /// Date the strategy here instead of the clock.
    pub when: Option<TimestampUtc>,
    /// Marks the message brackets as automatic.
    pub auto: bool,
    /// Opaque value passed to creation events.
    pub carry: Option<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            persist: true,
            when: None,
            auto: false,
            carry: None,
        }
    }
}

pub struct EventSource<L: StrategyLog> {
    log: L,
    tree: Tenant,
    emitter: EventEmitter,
    settings: Arc<dyn SettingsReader>,
    clock: Arc<dyn Clock>,
    last_sequence: u64,
    applied: u64,
    halted: Option<String>,
    replaying: bool,
}

impl<L: StrategyLog> EventSource<L> {
    pub fn new(log: L, settings: Arc<dyn SettingsReader>, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            tree: Tenant::new(),
            emitter: EventEmitter::new(),
            settings,
            clock,
            last_sequence: 0,
            applied: 0,
            halted: None,
            replaying: false,
        }
    }

    pub fn tree(&self) -> &Tenant {
        &self.tree
    }

    pub fn emitter_mut(&mut self) -> &mut EventEmitter {
        &mut self.emitter
    }

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.emitter.on(kind, callback)
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut L {
        &mut self.log
    }

    pub fn settings(&self) -> &dyn SettingsReader {
        self.settings.as_ref()
    }

    pub fn now(&self) -> TimestampUtc {
        self.clock.now()
    }

    /// Sequence number of the last strategy stored or replayed.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Number of strategies executed so far, sub-strategies excluded.
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.tree.users()
    }

    pub fn backlogs(&self) -> impl Iterator<Item = &Backlog> {
        self.tree.backlogs()
    }

    pub fn workitems(&self) -> impl Iterator<Item = &Workitem> {
        self.tree.workitems()
    }

    pub fn pomodoros(&self) -> impl Iterator<Item = (&Workitem, &Pomodoro)> {
        self.tree.pomodoros()
    }

    /// The strategy that seeds an empty log: the configured user, created by the system.
    pub fn init_strategy(&self) -> Strategy {
        Strategy::new(
            1,
            self.clock.now(),
            ADMIN_USER,
            StrategyKind::CreateUser {
                identity: self.settings.username(),
                name: self.settings.fullname(),
            },
        )
    }

    fn ensure_running(&self) -> Result<(), LedgerError> {
        match &self.halted {
            Some(reason) => Err(LedgerError::Halted {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn halt(&mut self, err: &LedgerError) {
        tracing::error!(error = %err, log = self.log.name(), "event source halted");
        self.halted = Some(err.to_string());
    }

    fn check_sequence(&mut self, received: u64) -> Result<(), LedgerError> {
        let expected = self.last_sequence + 1;
        if received != expected {
            let err = LedgerError::Sequence { expected, received };
            self.halt(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Replays the stored history, seeding an empty log first, then reconciles.
    ///
    /// With `mute_events` only message brackets are emitted while replaying.
    pub fn start(&mut self, mute_events: bool) -> Result<(), LedgerError> {
        self.ensure_running()?;
        self.emitter.emit(&Event::SourceMessagesRequested);
        if mute_events {
            self.emitter.mute();
        }
        let result = self.replay();
        if mute_events {
            self.emitter.unmute();
        }
        result?;
        self.emitter.emit(&Event::SourceMessagesProcessed);
        Ok(())
    }

    fn replay(&mut self) -> Result<(), LedgerError> {
        let mut strategies = self.log.load()?;
        if strategies.is_empty() {
            let init = self.init_strategy();
            self.log.append(std::slice::from_ref(&init))?;
            strategies.push(init);
        }
        tracing::debug!(
            count = strategies.len(),
            log = self.log.name(),
            "replaying strategies"
        );
        self.replaying = true;
        let result = self.replay_all(&strategies);
        self.replaying = false;
        result?;
        self.auto_seal()?;
        Ok(())
    }

    fn replay_all(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError> {
        for strategy in strategies {
            self.check_sequence(strategy.sequence)?;
            if let Err(err) = self.execute_prepared(strategy, false) {
                if !err.is_fatal() {
                    self.halt(&err);
                }
                return Err(err);
            }
            self.last_sequence = strategy.sequence;
        }
        Ok(())
    }

    /// Executes a new strategy issued by the configured user, now.
    pub fn execute(&mut self, kind: StrategyKind) -> Result<Strategy, LedgerError> {
        self.execute_with(kind, ExecuteOptions::default())
    }

    pub fn execute_with(
        &mut self,
        kind: StrategyKind,
        options: ExecuteOptions,
    ) -> Result<Strategy, LedgerError> {
        let actor = self.settings.username();
        self.execute_as(&actor, kind, options)
    }

    /// Builds, executes and (optionally) persists a strategy for `actor`.
    ///
    /// A failed strategy leaves the tree as it was before it ran and consumes no
    /// sequence number.
    pub fn execute_as(
        &mut self,
        actor: &str,
        kind: StrategyKind,
        options: ExecuteOptions,
    ) -> Result<Strategy, LedgerError> {
        self.ensure_running()?;
        let when = options.when.unwrap_or_else(|| self.clock.now());
        let mut strategy =
            Strategy::new(self.last_sequence + 1, when, actor, kind).with_carry(options.carry);
        let mut snapshot = self.tree.clone();

        if let Err(err) = self.execute_checkpointed(&strategy, options.auto, Some(&mut snapshot)) {
            self.tree = snapshot;
            return Err(err);
        }

        if options.persist {
            // Persisted catch-ups may have consumed sequence numbers
            strategy.sequence = self.last_sequence + 1;
            if let Err(err) = self.log.append(std::slice::from_ref(&strategy)) {
                tracing::warn!(error = %err, strategy = %strategy, "failed to persist strategy");
                self.tree = snapshot;
                return Err(err);
            }
            self.last_sequence = strategy.sequence;
        }
        Ok(strategy)
    }

    /// Runs an already sequenced strategy inside message brackets.
    ///
    /// If the strategy asks for reconciliation, overdue intervals are sealed as of
    /// the strategy's own date and it is retried once. A second request means a
    /// timer is still running; the strategy is rejected and the source keeps serving.
    pub fn execute_prepared(&mut self, strategy: &Strategy, auto: bool) -> Result<(), LedgerError> {
        self.execute_checkpointed(strategy, auto, None)
    }

    /// Like [`Self::execute_prepared`]; `checkpoint` is moved forward past any
    /// reconciliation so a later failure does not roll persisted catch-ups back.
    fn execute_checkpointed(
        &mut self,
        strategy: &Strategy,
        auto: bool,
        checkpoint: Option<&mut Tenant>,
    ) -> Result<(), LedgerError> {
        self.ensure_running()?;
        self.emitter.emit(&Event::BeforeMessageProcessed {
            strategy: strategy.clone(),
            auto,
        });
        let outcome = self.run(strategy)?;
        self.emitter.emit(&Event::AfterMessageProcessed {
            strategy: strategy.clone(),
            auto,
        });

        if let Outcome::AutoSeal { workitem_name, .. } = outcome {
            tracing::info!(
                running = %workitem_name,
                strategy = %strategy,
                "another pomodoro is running, reconciling before retry"
            );
            self.auto_seal_at(strategy.when)?;
            if let Some(checkpoint) = checkpoint {
                *checkpoint = self.tree.clone();
            }
            if let Outcome::AutoSeal { workitem_name, .. } = self.run(strategy)? {
                return Err(LedgerError::ConcurrentTimer {
                    workitem: workitem_name,
                });
            }
        }
        self.applied += 1;
        Ok(())
    }

    fn run(&mut self, strategy: &Strategy) -> Result<Outcome, LedgerError> {
        let mut ctx = ExecutionContext {
            tree: &mut self.tree,
            emitter: &mut self.emitter,
            settings: self.settings.as_ref(),
        };
        strategy.execute(&mut ctx)
    }

    /// Reconciles against the clock.
    pub fn auto_seal(&mut self) -> Result<usize, LedgerError> {
        let now = self.clock.now();
        self.auto_seal_at(now)
    }

    /// Seals every interval overdue as of `now`. Catch-ups are persisted unless
    /// the source is replaying, where the history already implies them.
    pub fn auto_seal_at(&mut self, now: TimestampUtc) -> Result<usize, LedgerError> {
        let grace = self.settings.auto_seal_after();
        let catch_ups = auto_seal::plan(&self.tree, now, grace)?;
        let persist = !self.replaying;
        auto_seal::apply(catch_ups, |catch_up| {
            let options = ExecuteOptions {
                persist,
                when: Some(catch_up.when),
                auto: true,
                carry: None,
            };
            self.execute_as(&catch_up.owner, catch_up.kind, options)
                .map(|_| ())
        })
    }

    /// Applies a strategy received from elsewhere, without persisting it.
    ///
    /// Returns `false` for an already applied (redelivered) sequence number.
    pub fn apply_remote(&mut self, strategy: &Strategy) -> Result<bool, LedgerError> {
        self.ensure_running()?;
        if strategy.sequence <= self.last_sequence {
            tracing::debug!(sequence = strategy.sequence, "skipping redelivered strategy");
            return Ok(false);
        }
        self.check_sequence(strategy.sequence)?;
        let mut snapshot = self.tree.clone();
        // The sending side persists its own catch-ups.
        self.replaying = true;
        let result = self.execute_checkpointed(strategy, false, Some(&mut snapshot));
        self.replaying = false;
        if let Err(err) = result {
            self.tree = snapshot;
            return Err(err);
        }
        self.last_sequence = strategy.sequence;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
