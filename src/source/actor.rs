//! Ledger actor: owns an [`EventSource`] on its own task.
//!
//! Callers talk to it with messages and oneshot replies. Events are re-published
//! on a broadcast channel and the tree on a watch channel, so UI code never runs
//! on the actor's task.

use super::{EventSource, ExecuteOptions, FileLog, StrategyLog};
use crate::config::{LedgerConfig, SettingsReader};
use crate::crypto;
use crate::domain::{Clock, LedgerError, Tenant};
use crate::events::Event;
use crate::strategy::{Strategy, StrategyKind};
use async_trait::async_trait;
use ractor::concurrency::JoinHandle;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};

pub type DynSource = EventSource<Box<dyn StrategyLog>>;

/// Messages that can be sent to the ledger actor.
pub enum LedgerMessage {
    /// Execute a new local strategy and return it as stored.
    Execute(
        Box<StrategyKind>,
        ExecuteOptions,
        oneshot::Sender<Result<Strategy, LedgerError>>,
    ),
    /// Apply a strategy received from a peer.
    ApplyRemote(Box<Strategy>, oneshot::Sender<Result<bool, LedgerError>>),
    /// Reconcile now and report how many catch-ups ran.
    AutoSeal(oneshot::Sender<Result<usize, LedgerError>>),
    /// Periodic reconciliation; failures are only logged.
    Tick,
    GetTree(oneshot::Sender<Tenant>),
    LastSequence(oneshot::Sender<u64>),
}

/// Arguments for spawning a ledger actor.
pub struct LedgerActorArgs {
    pub source: DynSource,
    /// Mute non-bracket events while replaying history.
    pub mute_replay: bool,
    /// Reconcile on this period, if set.
    pub seal_interval: Option<Duration>,
    /// Watch channel sender for tree snapshots.
    pub tree_tx: watch::Sender<Tenant>,
    /// Broadcast channel sender for event streaming.
    pub event_tx: broadcast::Sender<Event>,
}

pub struct LedgerActorState {
    source: DynSource,
    tree_tx: watch::Sender<Tenant>,
    ticker: Option<JoinHandle<()>>,
}

impl LedgerActorState {
    fn publish_tree(&self) {
        self.tree_tx.send_replace(self.source.tree().clone());
    }
}

pub struct LedgerActor;

#[async_trait]
impl Actor for LedgerActor {
    type Msg = LedgerMessage;
    type State = LedgerActorState;
    type Arguments = LedgerActorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut source = args.source;
        let event_tx = args.event_tx;
        source.emitter_mut().on_any(move |event| {
            // No receivers is fine
            let _ = event_tx.send(event.clone());
        });
        source.start(args.mute_replay)?;

        let ticker = args
            .seal_interval
            .map(|period| myself.send_interval(period, || LedgerMessage::Tick));

        let state = LedgerActorState {
            source,
            tree_tx: args.tree_tx,
            ticker,
        };
        state.publish_tree();
        Ok(state)
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            LedgerMessage::Execute(kind, options, reply) => {
                let result = state.source.execute_with(*kind, options);
                state.publish_tree();
                if reply.send(result).is_err() {
                    tracing::debug!("Execute reply channel closed");
                }
            }
            LedgerMessage::ApplyRemote(strategy, reply) => {
                let result = state.source.apply_remote(&strategy);
                state.publish_tree();
                if reply.send(result).is_err() {
                    tracing::debug!("ApplyRemote reply channel closed");
                }
            }
            LedgerMessage::AutoSeal(reply) => {
                let result = state.source.auto_seal();
                state.publish_tree();
                if reply.send(result).is_err() {
                    tracing::debug!("AutoSeal reply channel closed");
                }
            }
            LedgerMessage::Tick => {
                if state.source.halt_reason().is_some() {
                    return Ok(());
                }
                match state.source.auto_seal() {
                    Ok(0) => {}
                    Ok(count) => {
                        tracing::debug!(count, "periodic reconciliation sealed pomodoros");
                        state.publish_tree();
                    }
                    Err(err) => tracing::warn!(error = %err, "periodic reconciliation failed"),
                }
            }
            LedgerMessage::GetTree(reply) => {
                if reply.send(state.source.tree().clone()).is_err() {
                    tracing::debug!("GetTree reply channel closed");
                }
            }
            LedgerMessage::LastSequence(reply) => {
                if reply.send(state.source.last_sequence()).is_err() {
                    tracing::debug!("LastSequence reply channel closed");
                }
            }
        }

        Ok(())
    }
}

/// Helper to create actor arguments for a file-backed ledger.
pub fn create_actor_args(
    config: &LedgerConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(
    LedgerActorArgs,
    watch::Receiver<Tenant>,
    broadcast::Receiver<Event>,
)> {
    let path = config.data_file_path()?;
    let cryptograph = crypto::cryptograph_for(&config.encryption)?;
    let log: Box<dyn StrategyLog> = Box::new(FileLog::new(path, cryptograph));
    let settings: Arc<dyn SettingsReader> = Arc::new(config.clone());
    Ok(actor_args(EventSource::new(log, settings, clock)))
}

/// Wraps an already built source with fresh channels.
pub fn actor_args(
    source: DynSource,
) -> (
    LedgerActorArgs,
    watch::Receiver<Tenant>,
    broadcast::Receiver<Event>,
) {
    let (tree_tx, tree_rx) = watch::channel(source.tree().clone());
    let (event_tx, event_rx) = broadcast::channel(256);
    let args = LedgerActorArgs {
        source,
        mute_replay: true,
        seal_interval: None,
        tree_tx,
        event_tx,
    };
    (args, tree_rx, event_rx)
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
