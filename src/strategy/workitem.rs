use super::{find_backlog, find_workitem, snapshot_workitem, ExecutionContext, Outcome, Strategy, StrategyKind};
use crate::domain::{LedgerError, SealReason, Workitem, WorkitemKey};
use crate::events::Event;

/// UIDs are checked across all of the owner's backlogs, since the other work item
/// strategies locate items by UID alone.
pub(super) fn create(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    backlog_uid: &str,
    name: &str,
) -> Result<Outcome, LedgerError> {
    let owner = s.actor.as_str();
    let backlog = find_backlog(ctx.tree, owner, backlog_uid)?.clone();
    if ctx.tree.find_workitem_key(owner, uid).is_some() {
        return Err(LedgerError::already_exists("Workitem", uid));
    }
    ctx.emit(Event::BeforeWorkitemCreate {
        backlog,
        uid: uid.to_string(),
        name: name.to_string(),
    });
    ctx.tree
        .insert_workitem(Workitem::new(uid, name, owner, backlog_uid, s.when))?;
    let key = WorkitemKey::new(owner, backlog_uid, uid);
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::AfterWorkitemCreate {
        workitem,
        carry: s.carry.clone(),
    });
    Ok(Outcome::Done)
}

pub(super) fn rename(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    new_name: &str,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    if workitem.name() == new_name {
        return Ok(Outcome::Done);
    }
    if workitem.is_sealed() {
        return Err(LedgerError::transition(format!(
            "cannot rename sealed work item \"{}\"",
            workitem.name()
        )));
    }
    let old_name = workitem.name().to_string();
    ctx.emit(Event::BeforeWorkitemRename {
        workitem,
        new_name: new_name.to_string(),
    });
    ctx.tree.workitem_mut(&key)?.rename(new_name);
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::AfterWorkitemRename { workitem, old_name });
    Ok(Outcome::Done)
}

pub(super) fn delete(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    let running = workitem.has_running_pomodoro();
    ctx.emit(Event::BeforeWorkitemDelete { workitem });
    if running {
        void_running(s, ctx, uid)?;
    }
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = ctx.tree.remove_workitem(&key)?;
    ctx.emit(Event::AfterWorkitemDelete { workitem });
    Ok(Outcome::Done)
}

/// Voids the running interval, if any, then seals the work item.
pub(super) fn complete(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    target: SealReason,
) -> Result<Outcome, LedgerError> {
    let (key, workitem) = find_workitem(ctx.tree, &s.actor, uid)?;
    if workitem.is_sealed() {
        return Err(LedgerError::transition(format!(
            "work item \"{}\" is already sealed",
            workitem.name()
        )));
    }
    let running = workitem.has_running_pomodoro();
    ctx.emit(Event::BeforeWorkitemComplete { workitem, target });
    if running {
        void_running(s, ctx, uid)?;
    }
    ctx.tree.workitem_mut(&key)?.seal(target, s.when)?;
    ctx.tree.touch_workitem(&key, s.when);
    let workitem = snapshot_workitem(ctx.tree, &key)?;
    ctx.emit(Event::AfterWorkitemComplete { workitem, target });
    Ok(Outcome::Done)
}

fn void_running(s: &Strategy, ctx: &mut ExecutionContext<'_>, uid: &str) -> Result<Outcome, LedgerError> {
    s.execute_another(
        ctx,
        StrategyKind::VoidPomodoro {
            workitem_uid: uid.to_string(),
        },
    )
}
