use super::{find_backlog, ExecutionContext, Outcome, Strategy, StrategyKind};
use crate::domain::{Backlog, BacklogKey, LedgerError};
use crate::events::Event;

pub(super) fn create(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    name: &str,
) -> Result<Outcome, LedgerError> {
    let owner = s.actor.as_str();
    if ctx.tree.backlog(owner, uid).is_some() {
        return Err(LedgerError::already_exists("Backlog", uid));
    }
    ctx.emit(Event::BeforeBacklogCreate {
        owner: owner.to_string(),
        uid: uid.to_string(),
        name: name.to_string(),
    });
    ctx.tree
        .insert_backlog(Backlog::new(owner, uid, name, s.when))?;
    let key = BacklogKey::new(owner, uid);
    ctx.tree.touch_backlog(&key, s.when);
    let backlog = find_backlog(ctx.tree, owner, uid)?.clone();
    ctx.emit(Event::AfterBacklogCreate { backlog });
    Ok(Outcome::Done)
}

pub(super) fn rename(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
    new_name: &str,
) -> Result<Outcome, LedgerError> {
    let owner = s.actor.as_str();
    let backlog = find_backlog(ctx.tree, owner, uid)?.clone();
    let old_name = backlog.name().to_string();
    let key = backlog.key();
    ctx.emit(Event::BeforeBacklogRename {
        backlog,
        new_name: new_name.to_string(),
    });
    ctx.tree.rename_backlog(&key, new_name)?;
    ctx.tree.touch_backlog(&key, s.when);
    let backlog = find_backlog(ctx.tree, owner, uid)?.clone();
    ctx.emit(Event::AfterBacklogRename { backlog, old_name });
    Ok(Outcome::Done)
}

/// Deletes every work item in the backlog through its own strategy, then the backlog.
pub(super) fn delete(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    uid: &str,
) -> Result<Outcome, LedgerError> {
    let owner = s.actor.as_str();
    let backlog = find_backlog(ctx.tree, owner, uid)?.clone();
    let key = backlog.key();
    let workitems = backlog.workitem_uids().to_vec();
    ctx.emit(Event::BeforeBacklogDelete { backlog });
    for workitem in workitems {
        s.execute_another(ctx, StrategyKind::DeleteWorkitem { uid: workitem })?;
    }
    ctx.tree.touch_backlog(&key, s.when);
    let backlog = ctx.tree.remove_backlog(&key)?;
    ctx.emit(Event::AfterBacklogDelete { backlog });
    Ok(Outcome::Done)
}
