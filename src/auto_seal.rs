//! Reconciliation of intervals whose planned end passed while nobody was watching.
//!
//! Planning is pure: [`plan`] inspects the tree and lists the catch-up strategies,
//! each dated at the moment the transition should have happened. Executing them
//! is left to the caller, so the same plan can be persisted live or applied
//! silently during replay.

use crate::domain::{LedgerError, PomodoroState, Tenant, TimestampUtc};
use crate::strategy::StrategyKind;

/// One overdue transition.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchUp {
    /// Owner of the work item, used as the strategy actor.
    pub owner: String,
    pub workitem_name: String,
    pub when: TimestampUtc,
    pub kind: StrategyKind,
}

fn overdue(planned_end: TimestampUtc, now: TimestampUtc, grace_seconds: u32) -> bool {
    planned_end.seconds_until(now) > f64::from(grace_seconds)
}

/// Lists catch-ups until every running interval is either within its grace period
/// or sealed. An interval found working may need both a rest start and a finish.
pub fn plan(
    tree: &Tenant,
    now: TimestampUtc,
    grace_seconds: u32,
) -> Result<Vec<CatchUp>, LedgerError> {
    let mut catch_ups = Vec::new();
    for workitem in tree.workitems() {
        for pomodoro in workitem.pomodoros() {
            let catch_up = |when: TimestampUtc, kind: StrategyKind| CatchUp {
                owner: workitem.owner().to_string(),
                workitem_name: workitem.name().to_string(),
                when,
                kind,
            };
            let uid = workitem.uid().to_string();
            let end_of_rest = match pomodoro.state() {
                PomodoroState::Working => {
                    let Some(end_of_work) = pomodoro.planned_end_of_work() else {
                        continue;
                    };
                    if !overdue(end_of_work, now, grace_seconds) {
                        continue;
                    }
                    catch_ups.push(catch_up(
                        end_of_work,
                        StrategyKind::StartRest {
                            workitem_uid: uid.clone(),
                            rest_duration: pomodoro.rest_duration(),
                        },
                    ));
                    end_of_work.plus_seconds(pomodoro.rest_duration())?
                }
                PomodoroState::Resting => match pomodoro.planned_end_of_rest() {
                    Some(end) => end,
                    None => continue,
                },
                _ => continue,
            };
            if overdue(end_of_rest, now, grace_seconds) {
                catch_ups.push(catch_up(
                    end_of_rest,
                    StrategyKind::FinishPomodoroInternal { workitem_uid: uid },
                ));
            }
        }
    }
    Ok(catch_ups)
}

/// Runs every catch-up through `executor`, stopping at the first failure.
pub fn apply<F>(catch_ups: Vec<CatchUp>, mut executor: F) -> Result<usize, LedgerError>
where
    F: FnMut(CatchUp) -> Result<(), LedgerError>,
{
    let mut applied = 0;
    for catch_up in catch_ups {
        tracing::info!(
            workitem = %catch_up.workitem_name,
            strategy = catch_up.kind.tag(),
            when = %catch_up.when,
            "auto-sealing overdue pomodoro"
        );
        executor(catch_up)?;
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
#[path = "auto_seal_tests.rs"]
mod tests;
