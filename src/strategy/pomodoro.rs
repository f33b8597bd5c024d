use super::{find_workitem, pomodoro_mut, snapshot_workitem, ExecutionContext, Outcome, Strategy};
use crate::domain::{LedgerError, Pomodoro, SealReason, WorkitemKey, MAX_POMODOROS};
use crate::events::Event;

fn require_open(name: &str, sealed: bool) -> Result<(), LedgerError> {
    if sealed {
        return Err(LedgerError::transition(format!(
            "work item \"{}\" is sealed",
            name
        )));
    }
    Ok(())
}

fn snapshot_pomodoro(
    ctx: &ExecutionContext<'_>,
    key: &WorkitemKey,
    index: usize,
) -> Result<Pomodoro, LedgerError> {
    snapshot_workitem(ctx.tree, key)?
        .pomodoros()
        .get(index)
        .cloned()
        .ok_or_else(|| LedgerError::not_found("Pomodoro", &key.uid))
}

/// Appends intervals with the configured default durations.
pub(super) fn add(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    count: u32,
) -> Result<Outcome, LedgerError> {
    if count < 1 {
        return Err(LedgerError::parameter("cannot add fewer than one pomodoro"));
    }
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    require_open(workitem.name(), workitem.is_sealed())?;
    let total = workitem.pomodoros().len().saturating_add(count as usize);
    if total > MAX_POMODOROS {
        return Err(LedgerError::parameter(format!(
            "\"{}\" would hold {} pomodoros, at most {} are allowed",
            workitem.name(),
            total,
            MAX_POMODOROS
        )));
    }
    ctx.emit(Event::BeforePomodoroAdd { workitem, count });
    let work = ctx.settings.default_work_duration();
    let rest = ctx.settings.default_rest_duration();
    ctx.tree
        .workitem_mut(&key)?
        .add_pomodoros(count, work, rest, s.when);
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::AfterPomodoroAdd { workitem, count });
    Ok(Outcome::Done)
}

/// Removes not-yet-started intervals from the tail.
pub(super) fn remove(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    count: u32,
) -> Result<Outcome, LedgerError> {
    if count < 1 {
        return Err(LedgerError::parameter("cannot remove fewer than one pomodoro"));
    }
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    require_open(workitem.name(), workitem.is_sealed())?;
    let startable = workitem
        .pomodoros()
        .iter()
        .filter(|p| p.is_startable())
        .count();
    if startable < count as usize {
        return Err(LedgerError::parameter(format!(
            "cannot remove {} pomodoros from \"{}\", only {} not started",
            count,
            workitem.name(),
            startable
        )));
    }
    ctx.emit(Event::BeforePomodoroRemove { workitem, count });
    ctx.tree
        .workitem_mut(&key)?
        .remove_startable_pomodoros(count)?;
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::AfterPomodoroRemove { workitem, count });
    Ok(Outcome::Done)
}

/// Starts the first not-yet-started interval, starting the work item too if needed.
///
/// Returns [`Outcome::AutoSeal`] without touching anything when another interval is
/// already running anywhere in the tenant.
pub(super) fn start_work(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    work_duration: u32,
    rest_duration: u32,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    require_open(workitem.name(), workitem.is_sealed())?;
    if let Some(running) = ctx.tree.running_workitem() {
        return Ok(Outcome::AutoSeal {
            workitem_uid: running.uid().to_string(),
            workitem_name: running.name().to_string(),
        });
    }
    let index = workitem
        .pomodoros()
        .iter()
        .position(Pomodoro::is_startable)
        .ok_or_else(|| {
            LedgerError::transition(format!(
                "no pomodoros left to start in \"{}\"",
                workitem.name()
            ))
        })?;

    if !workitem.is_running() {
        ctx.emit(Event::BeforeWorkitemStart { workitem });
        ctx.tree.workitem_mut(&key)?.start()?;
        ctx.tree.touch_workitem(&key, s.when);
        let workitem = snapshot_workitem(ctx.tree, &key)?;
        ctx.emit(Event::AfterWorkitemStart { workitem });
    }

    let pomodoro = snapshot_pomodoro(ctx, &key, index)?;
    let work = if work_duration == 0 {
        pomodoro.work_duration()
    } else {
        work_duration
    };
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::BeforePomodoroWorkStart {
        workitem,
        pomodoro,
        work_duration: work,
    });
    let target = pomodoro_mut(ctx.tree, &key, index)?;
    target.update_work_duration(work);
    if rest_duration != 0 {
        target.update_rest_duration(rest_duration);
    }
    target.start_work(s.when)?;
    ctx.tree.touch_pomodoro(&key, index, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    let pomodoro = snapshot_pomodoro(ctx, &key, index)?;
    ctx.emit(Event::AfterPomodoroWorkStart {
        workitem,
        pomodoro,
        work_duration: work,
    });
    Ok(Outcome::Done)
}

pub(super) fn start_rest(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    rest_duration: u32,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    if !workitem.is_running() {
        return Err(LedgerError::transition(format!(
            "work item \"{}\" is not running",
            workitem.name()
        )));
    }
    let (index, pomodoro) = workitem
        .pomodoros()
        .iter()
        .enumerate()
        .find(|(_, p)| p.is_working())
        .map(|(i, p)| (i, p.clone()))
        .ok_or_else(|| {
            LedgerError::transition(format!(
                "no pomodoro in \"{}\" is in work state",
                workitem.name()
            ))
        })?;
    let rest = if rest_duration == 0 {
        pomodoro.rest_duration()
    } else {
        rest_duration
    };
    ctx.emit(Event::BeforePomodoroRestStart {
        workitem,
        pomodoro,
        rest_duration: rest,
    });
    let target = pomodoro_mut(ctx.tree, &key, index)?;
    target.update_rest_duration(rest);
    target.start_rest(s.when)?;
    ctx.tree.touch_pomodoro(&key, index, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    let pomodoro = snapshot_pomodoro(ctx, &key, index)?;
    ctx.emit(Event::AfterPomodoroRestStart {
        workitem,
        pomodoro,
        rest_duration: rest,
    });
    Ok(Outcome::Done)
}

/// Cancels the running interval of a running work item.
pub(super) fn void(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    if !workitem.is_running() {
        return Err(LedgerError::transition(format!(
            "work item \"{}\" is not running",
            workitem.name()
        )));
    }
    let (index, pomodoro) = workitem
        .running_pomodoro()
        .map(|(i, p)| (i, p.clone()))
        .ok_or_else(|| {
            LedgerError::transition(format!(
                "no running pomodoro in \"{}\"",
                workitem.name()
            ))
        })?;
    seal(s, ctx, &key, index, pomodoro, SealReason::Canceled)
}

pub(super) fn complete(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    target: SealReason,
) -> Result<Outcome, LedgerError> {
    match target {
        SealReason::Canceled => void(s, ctx, uid),
        SealReason::Finished => {
            tracing::debug!(workitem = uid, "ignoring legacy pomodoro completion");
            Ok(Outcome::Done)
        }
    }
}

/// Seals a resting interval as finished.
pub(super) fn finish(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    let (index, pomodoro) = workitem
        .pomodoros()
        .iter()
        .enumerate()
        .find(|(_, p)| p.is_resting())
        .map(|(i, p)| (i, p.clone()))
        .ok_or_else(|| {
            LedgerError::transition(format!(
                "no resting pomodoro in \"{}\"",
                workitem.name()
            ))
        })?;
    seal(s, ctx, &key, index, pomodoro, SealReason::Finished)
}

fn seal(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    key: &WorkitemKey,
    index: usize,
    pomodoro: Pomodoro,
    target: SealReason,
) -> Result<Outcome, LedgerError> {
    let workitem = snapshot_workitem(ctx.tree, key)?;
    ctx.emit(Event::BeforePomodoroComplete {
        workitem,
        pomodoro,
        target,
    });
    let sealed = pomodoro_mut(ctx.tree, key, index)?;
    match target {
        SealReason::Finished => sealed.finish()?,
        SealReason::Canceled => sealed.cancel()?,
    }
    ctx.tree.touch_pomodoro(key, index, s.when);
    let workitem = snapshot_workitem(ctx.tree, key)?;
    let pomodoro = snapshot_pomodoro(ctx, key, index)?;
    ctx.emit(Event::AfterPomodoroComplete {
        workitem,
        pomodoro,
        target,
    });
    Ok(Outcome::Done)
}
