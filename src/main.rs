use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use focus_ledger::domain::{generate_uid, Pomodoro, PomodoroState, SystemClock, UserActivity};
use focus_ledger::journal::EventJournal;
use focus_ledger::source::actor::{create_actor_args, LedgerActor, LedgerMessage};
use focus_ledger::source::StrategyLog;
use focus_ledger::{crypto, paths, ExecuteOptions, FileLog, LedgerConfig, StrategyKind, Tenant, TimestampUtc};
use ractor::{Actor, ActorRef};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "focus")]
#[command(about = "Event-sourced pomodoro ledger")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("FOCUS_LEDGER_GIT_SHA"), ")"))]
struct Cli {
    /// Settings file (defaults to ~/.focus-ledger/config.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy log file (overrides the configured one)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Record every event to the JSONL journal
    #[arg(long)]
    journal: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print users, backlogs, work items and the current activity
    Show,
    /// Seal pomodoros whose planned end has passed
    Seal,
    /// Print the stored strategies
    Log,
    /// Execute one strategy, e.g. `exec CreateBacklog <uid> Today`
    Exec {
        tag: String,
        params: Vec<String>,
    },
    /// Print a fresh UID for a new backlog or work item
    NewUid,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn request<T>(
    actor: &ActorRef<LedgerMessage>,
    build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    actor
        .send_message(build(tx))
        .map_err(|_| anyhow::anyhow!("Ledger actor is not running"))?;
    rx.await.context("Ledger actor dropped the reply")
}

fn pomodoro_glyph(pomodoro: &Pomodoro) -> char {
    match pomodoro.state() {
        PomodoroState::New => 'o',
        PomodoroState::Working => 'W',
        PomodoroState::Resting => 'R',
        PomodoroState::Finished => 'x',
        PomodoroState::Canceled => '-',
    }
}

fn format_remaining(seconds: f64) -> String {
    let whole = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

fn print_tree(tree: &Tenant, now: TimestampUtc) {
    for user in tree.users().filter(|u| !u.is_system()) {
        let activity = match tree.user_activity(user.identity(), now) {
            UserActivity::Idle => "idle".to_string(),
            UserActivity::Focus {
                workitem,
                remaining,
            } => format!("focus on \"{}\", {} left", workitem, format_remaining(remaining)),
            UserActivity::Rest {
                workitem,
                remaining,
            } => format!("resting after \"{}\", {} left", workitem, format_remaining(remaining)),
        };
        println!("{} <{}>  [{}]", user.name(), user.identity(), activity);
        for backlog in tree.backlogs_of(user.identity()) {
            println!("  {} ({})", backlog.name(), backlog.uid());
            for workitem in tree.workitems_of(backlog) {
                let glyphs: String = workitem.pomodoros().iter().map(pomodoro_glyph).collect();
                let state = if workitem.is_sealed() {
                    "sealed"
                } else if workitem.is_running() {
                    "running"
                } else {
                    "planned"
                };
                println!(
                    "    [{}] {} ({}) {}",
                    state,
                    workitem.name(),
                    workitem.uid(),
                    glyphs
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = LedgerConfig::load_or_default(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.source.data_file = Some(data);
    }

    match cli.command {
        Command::NewUid => {
            println!("{}", generate_uid());
            return Ok(());
        }
        Command::Log => {
            let cryptograph = crypto::cryptograph_for(&config.encryption)?;
            let mut log = FileLog::new(config.data_file_path()?, cryptograph);
            for strategy in log.load()? {
                println!("{}", strategy);
            }
            return Ok(());
        }
        _ => {}
    }

    let (mut args, _tree_rx, _event_rx) = create_actor_args(&config, Arc::new(SystemClock))?;
    let journal = if cli.journal || config.source.journal {
        let path = paths::journal_path(&config.data_file_path()?)?;
        let journal = Arc::new(EventJournal::open(&path)?);
        journal.attach(args.source.emitter_mut());
        Some(journal)
    } else {
        None
    };

    let (actor, handle) = Actor::spawn(None, LedgerActor, args)
        .await
        .context("Failed to start the ledger")?;

    let outcome = match cli.command {
        Command::Show => {
            let tree = request(&actor, LedgerMessage::GetTree).await?;
            print_tree(&tree, TimestampUtc::now());
            Ok(())
        }
        Command::Seal => {
            let sealed = request(&actor, LedgerMessage::AutoSeal).await??;
            println!("sealed {} overdue transition(s)", sealed);
            Ok(())
        }
        Command::Exec { tag, params } => {
            let result = match StrategyKind::from_params(&tag, &params) {
                Ok(kind) => {
                    request(&actor, |tx| {
                        LedgerMessage::Execute(Box::new(kind), ExecuteOptions::default(), tx)
                    })
                    .await?
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(strategy) => {
                    println!("{}", strategy);
                    Ok(())
                }
                Err(err) => {
                    if let Some(journal) = &journal {
                        journal.log_rejected(&tag, &err.to_string());
                    }
                    Err(anyhow::Error::new(err).context(format!("{} was rejected", tag)))
                }
            }
        }
        Command::Log | Command::NewUid => Ok(()),
    };

    actor.stop(None);
    handle.await.context("Ledger actor did not shut down cleanly")?;
    outcome
}
