use super::{find_user, ExecutionContext, Outcome, Strategy, StrategyKind};
use crate::domain::{LedgerError, User};
use crate::events::Event;

/// User management is reserved for system users.
fn require_system(s: &Strategy, ctx: &ExecutionContext<'_>) -> Result<(), LedgerError> {
    if find_user(ctx.tree, &s.actor)?.is_system() {
        Ok(())
    } else {
        Err(LedgerError::unauthorized(format!(
            "{} is not allowed to manage users",
            s.actor
        )))
    }
}

fn target_user(ctx: &ExecutionContext<'_>, identity: &str, action: &str) -> Result<User, LedgerError> {
    let user = find_user(ctx.tree, identity)?;
    if user.is_system() {
        return Err(LedgerError::unauthorized(format!(
            "system user {} cannot be {}",
            identity, action
        )));
    }
    Ok(user.clone())
}

pub(super) fn create(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    identity: &str,
    name: &str,
) -> Result<Outcome, LedgerError> {
    require_system(s, ctx)?;
    if ctx.tree.user(identity).is_some() {
        return Err(LedgerError::already_exists("User", identity));
    }
    ctx.emit(Event::BeforeUserCreate {
        identity: identity.to_string(),
        name: name.to_string(),
    });
    ctx.tree.insert_user(User::new(identity, name, false, s.when));
    ctx.tree.touch_user(identity, s.when);
    let user = find_user(ctx.tree, identity)?.clone();
    ctx.emit(Event::AfterUserCreate { user });
    Ok(Outcome::Done)
}

pub(super) fn rename(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    identity: &str,
    new_name: &str,
) -> Result<Outcome, LedgerError> {
    require_system(s, ctx)?;
    let user = target_user(ctx, identity, "renamed")?;
    let old_name = user.name().to_string();
    ctx.emit(Event::BeforeUserRename {
        user,
        new_name: new_name.to_string(),
    });
    ctx.tree.rename_user(identity, new_name)?;
    ctx.tree.touch_user(identity, s.when);
    let user = find_user(ctx.tree, identity)?.clone();
    ctx.emit(Event::AfterUserRename { user, old_name });
    Ok(Outcome::Done)
}

/// Deletes the user's backlogs first, each through its own strategy.
pub(super) fn delete(
    s: &Strategy,
    ctx: &mut ExecutionContext<'_>,
    identity: &str,
) -> Result<Outcome, LedgerError> {
    require_system(s, ctx)?;
    let user = target_user(ctx, identity, "deleted")?;
    let backlogs = user.backlog_uids().to_vec();
    ctx.emit(Event::BeforeUserDelete { user });
    for uid in backlogs {
        s.execute_another_as(ctx, identity, StrategyKind::DeleteBacklog { uid })?;
    }
    ctx.tree.touch_user(identity, s.when);
    let user = ctx.tree.remove_user(identity)?;
    ctx.emit(Event::AfterUserDelete { user });
    Ok(Outcome::Done)
}
