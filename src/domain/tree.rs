//! The tenant tree: users own backlogs, backlogs own work items, work items own intervals.
//!
//! Entities live in flat maps keyed by their owning path, and parents keep the
//! ordered child UIDs. Parent links are the key fields, so modification dates can
//! bubble up without back-pointers.

use crate::domain::errors::LedgerError;
use crate::domain::pomodoro::Pomodoro;
use crate::domain::types::{TimestampUtc, ADMIN_NAME, ADMIN_USER};
use crate::domain::workitem::Workitem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backlog UIDs are unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BacklogKey {
    pub owner: String,
    pub uid: String,
}

impl BacklogKey {
    pub fn new(owner: &str, uid: &str) -> Self {
        Self {
            owner: owner.to_string(),
            uid: uid.to_string(),
        }
    }
}

/// Work item UIDs are unique per owning backlog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkitemKey {
    pub owner: String,
    pub backlog: String,
    pub uid: String,
}

impl WorkitemKey {
    pub fn new(owner: &str, backlog: &str, uid: &str) -> Self {
        Self {
            owner: owner.to_string(),
            backlog: backlog.to_string(),
            uid: uid.to_string(),
        }
    }

    pub fn backlog_key(&self) -> BacklogKey {
        BacklogKey::new(&self.owner, &self.backlog)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    identity: String,
    name: String,
    system: bool,
    created_at: TimestampUtc,
    last_modified: TimestampUtc,
    backlogs: Vec<String>,
}

impl User {
    pub(crate) fn new(identity: &str, name: &str, system: bool, when: TimestampUtc) -> Self {
        Self {
            identity: identity.to_string(),
            name: name.to_string(),
            system,
            created_at: when,
            last_modified: when,
            backlogs: Vec::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn created_at(&self) -> TimestampUtc {
        self.created_at
    }

    pub fn last_modified(&self) -> TimestampUtc {
        self.last_modified
    }

    /// Backlog UIDs in creation order.
    pub fn backlog_uids(&self) -> &[String] {
        &self.backlogs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backlog {
    uid: String,
    name: String,
    owner: String,
    created_at: TimestampUtc,
    last_modified: TimestampUtc,
    workitems: Vec<String>,
}

impl Backlog {
    pub(crate) fn new(owner: &str, uid: &str, name: &str, when: TimestampUtc) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            created_at: when,
            last_modified: when,
            workitems: Vec::new(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn key(&self) -> BacklogKey {
        BacklogKey::new(&self.owner, &self.uid)
    }

    pub fn created_at(&self) -> TimestampUtc {
        self.created_at
    }

    pub fn last_modified(&self) -> TimestampUtc {
        self.last_modified
    }

    /// Work item UIDs in creation order.
    pub fn workitem_uids(&self) -> &[String] {
        &self.workitems
    }
}

/// What a user is doing right now, derived from their running interval.
#[derive(Debug, Clone, PartialEq)]
pub enum UserActivity {
    Idle,
    Focus { workitem: String, remaining: f64 },
    Rest { workitem: String, remaining: f64 },
}

/// Root of the in-memory state. Only strategies mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    users: HashMap<String, User>,
    user_order: Vec<String>,
    backlogs: HashMap<BacklogKey, Backlog>,
    workitems: HashMap<WorkitemKey, Workitem>,
    last_modified: Option<TimestampUtc>,
}

impl Default for Tenant {
    fn default() -> Self {
        Self::new()
    }
}

impl Tenant {
    /// Creates a tenant that only holds the built-in system user.
    pub fn new() -> Self {
        let epoch = TimestampUtc(DateTime::<Utc>::default());
        let admin = User::new(ADMIN_USER, ADMIN_NAME, true, epoch);
        Self {
            users: HashMap::from([(ADMIN_USER.to_string(), admin)]),
            user_order: vec![ADMIN_USER.to_string()],
            backlogs: HashMap::new(),
            workitems: HashMap::new(),
            last_modified: None,
        }
    }

    pub fn last_modified(&self) -> Option<TimestampUtc> {
        self.last_modified
    }

    pub fn user(&self, identity: &str) -> Option<&User> {
        self.users.get(identity)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.user_order.iter().filter_map(|id| self.users.get(id))
    }

    pub fn backlog(&self, owner: &str, uid: &str) -> Option<&Backlog> {
        self.backlogs.get(&BacklogKey::new(owner, uid))
    }

    pub fn backlogs_of<'a>(&'a self, owner: &str) -> impl Iterator<Item = &'a Backlog> + 'a {
        let uids = self
            .users
            .get(owner)
            .map(|u| u.backlogs.as_slice())
            .unwrap_or_default();
        let owner = owner.to_string();
        uids.iter()
            .filter_map(move |uid| self.backlogs.get(&BacklogKey::new(&owner, uid)))
    }

    /// Every backlog, grouped by user in creation order.
    pub fn backlogs(&self) -> impl Iterator<Item = &Backlog> {
        self.users().flat_map(|u| self.backlogs_of(u.identity()))
    }

    pub fn workitem(&self, key: &WorkitemKey) -> Option<&Workitem> {
        self.workitems.get(key)
    }

    pub fn workitems_of<'a>(&'a self, backlog: &Backlog) -> impl Iterator<Item = &'a Workitem> + 'a {
        let key = backlog.key();
        let uids = self
            .backlogs
            .get(&key)
            .map(|b| b.workitems.as_slice())
            .unwrap_or_default();
        uids.iter().filter_map(move |uid| {
            self.workitems
                .get(&WorkitemKey::new(&key.owner, &key.uid, uid))
        })
    }

    /// Every work item in tree order.
    pub fn workitems(&self) -> impl Iterator<Item = &Workitem> {
        self.backlogs().flat_map(|b| self.workitems_of(b))
    }

    /// Every interval in tree order, with its work item.
    pub fn pomodoros(&self) -> impl Iterator<Item = (&Workitem, &Pomodoro)> {
        self.workitems()
            .flat_map(|w| w.pomodoros().iter().map(move |p| (w, p)))
    }

    /// Finds a work item by UID among the backlogs of `owner`.
    pub fn find_workitem_key(&self, owner: &str, uid: &str) -> Option<WorkitemKey> {
        let user = self.users.get(owner)?;
        user.backlogs
            .iter()
            .map(|backlog| WorkitemKey::new(owner, backlog, uid))
            .find(|key| self.workitems.contains_key(key))
    }

    pub fn find_workitem(&self, owner: &str, uid: &str) -> Option<&Workitem> {
        self.find_workitem_key(owner, uid)
            .and_then(|key| self.workitems.get(&key))
    }

    /// First work item holding a working or resting interval.
    pub fn running_workitem(&self) -> Option<&Workitem> {
        self.workitems().find(|w| w.has_running_pomodoro())
    }

    pub fn running_count(&self) -> usize {
        self.pomodoros().filter(|(_, p)| p.is_running()).count()
    }

    pub fn user_activity(&self, identity: &str, now: TimestampUtc) -> UserActivity {
        let running = self
            .backlogs_of(identity)
            .flat_map(|b| self.workitems_of(b))
            .find_map(|w| w.running_pomodoro().map(|(_, p)| (w, p)));
        match running {
            Some((w, p)) if p.is_working() => UserActivity::Focus {
                workitem: w.name().to_string(),
                remaining: p.remaining_time_in_current_state(now),
            },
            Some((w, p)) => UserActivity::Rest {
                workitem: w.name().to_string(),
                remaining: p.remaining_time_in_current_state(now),
            },
            None => UserActivity::Idle,
        }
    }

    pub(crate) fn insert_user(&mut self, user: User) {
        let identity = user.identity.clone();
        if self.users.insert(identity.clone(), user).is_none() {
            self.user_order.push(identity);
        }
    }

    pub(crate) fn rename_user(&mut self, identity: &str, name: &str) -> Result<(), LedgerError> {
        let user = self
            .users
            .get_mut(identity)
            .ok_or_else(|| LedgerError::not_found("User", identity))?;
        user.name = name.to_string();
        Ok(())
    }

    /// Removes a user that no longer owns any backlog.
    pub(crate) fn remove_user(&mut self, identity: &str) -> Result<User, LedgerError> {
        let user = self
            .users
            .remove(identity)
            .ok_or_else(|| LedgerError::not_found("User", identity))?;
        self.user_order.retain(|id| id != identity);
        Ok(user)
    }

    pub(crate) fn insert_backlog(&mut self, backlog: Backlog) -> Result<(), LedgerError> {
        let user = self
            .users
            .get_mut(&backlog.owner)
            .ok_or_else(|| LedgerError::not_found("User", &backlog.owner))?;
        user.backlogs.push(backlog.uid.clone());
        self.backlogs.insert(backlog.key(), backlog);
        Ok(())
    }

    pub(crate) fn rename_backlog(&mut self, key: &BacklogKey, name: &str) -> Result<(), LedgerError> {
        let backlog = self
            .backlogs
            .get_mut(key)
            .ok_or_else(|| LedgerError::not_found("Backlog", &key.uid))?;
        backlog.name = name.to_string();
        Ok(())
    }

    pub(crate) fn remove_backlog(&mut self, key: &BacklogKey) -> Result<Backlog, LedgerError> {
        let backlog = self
            .backlogs
            .remove(key)
            .ok_or_else(|| LedgerError::not_found("Backlog", &key.uid))?;
        if let Some(user) = self.users.get_mut(&key.owner) {
            user.backlogs.retain(|uid| uid != &key.uid);
        }
        Ok(backlog)
    }

    pub(crate) fn insert_workitem(&mut self, workitem: Workitem) -> Result<(), LedgerError> {
        let key = WorkitemKey::new(workitem.owner(), workitem.backlog_uid(), workitem.uid());
        let backlog = self
            .backlogs
            .get_mut(&key.backlog_key())
            .ok_or_else(|| LedgerError::not_found("Backlog", &key.backlog))?;
        backlog.workitems.push(key.uid.clone());
        self.workitems.insert(key, workitem);
        Ok(())
    }

    pub(crate) fn workitem_mut(&mut self, key: &WorkitemKey) -> Result<&mut Workitem, LedgerError> {
        self.workitems
            .get_mut(key)
            .ok_or_else(|| LedgerError::not_found("Workitem", &key.uid))
    }

    pub(crate) fn remove_workitem(&mut self, key: &WorkitemKey) -> Result<Workitem, LedgerError> {
        let workitem = self
            .workitems
            .remove(key)
            .ok_or_else(|| LedgerError::not_found("Workitem", &key.uid))?;
        if let Some(backlog) = self.backlogs.get_mut(&key.backlog_key()) {
            backlog.workitems.retain(|uid| uid != &key.uid);
        }
        Ok(workitem)
    }

    /// Marks the user and the tenant as modified.
    pub(crate) fn touch_user(&mut self, identity: &str, when: TimestampUtc) {
        if let Some(user) = self.users.get_mut(identity) {
            user.last_modified = when;
        }
        self.last_modified = Some(when);
    }

    /// Marks the backlog and everything above it as modified.
    pub(crate) fn touch_backlog(&mut self, key: &BacklogKey, when: TimestampUtc) {
        if let Some(backlog) = self.backlogs.get_mut(key) {
            backlog.last_modified = when;
        }
        self.touch_user(&key.owner, when);
    }

    /// Marks the work item and everything above it as modified.
    pub(crate) fn touch_workitem(&mut self, key: &WorkitemKey, when: TimestampUtc) {
        if let Some(workitem) = self.workitems.get_mut(key) {
            workitem.touch(when);
        }
        self.touch_backlog(&key.backlog_key(), when);
    }

    /// Marks one interval and everything above it as modified.
    pub(crate) fn touch_pomodoro(&mut self, key: &WorkitemKey, index: usize, when: TimestampUtc) {
        if let Some(pomodoro) = self
            .workitems
            .get_mut(key)
            .and_then(|w| w.pomodoro_mut(index))
        {
            pomodoro.touch(when);
        }
        self.touch_workitem(key, when);
    }
}

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tests;
