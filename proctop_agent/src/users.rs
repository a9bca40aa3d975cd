//! Numeric uid to account name resolution.

use std::cell::Cell;
use std::collections::HashMap;
use std::str::FromStr;

use sysinfo::{Uid, Users};
use tracing::debug;

pub trait AccountDirectory {
    /// Name for a raw uid string as found in `/proc/<pid>/status`.
    fn user_name(&self, uid: &str) -> Option<String>;

    /// Called once per monitor refresh, before any lookups.
    fn refresh(&mut self) {}
}

/// The host account database, loaded through sysinfo. A numeric uid with no
/// entry marks the list stale; the next `refresh` reloads it, so accounts
/// created after startup resolve one poll later.
pub struct SystemAccounts {
    users: Users,
    stale: Cell<bool>,
}

impl SystemAccounts {
    pub fn new() -> Self {
        Self {
            users: Users::new_with_refreshed_list(),
            stale: Cell::new(false),
        }
    }

    /// Whether a lookup missed since the last reload.
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }
}

impl Default for SystemAccounts {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountDirectory for SystemAccounts {
    fn user_name(&self, uid: &str) -> Option<String> {
        let uid = Uid::from_str(uid.trim()).ok()?;
        let name = self.users.get_user_by_id(&uid).map(|u| u.name().to_string());
        if name.is_none() {
            self.stale.set(true);
        }
        name
    }

    fn refresh(&mut self) {
        if self.stale.replace(false) {
            debug!("uid lookup missed, reloading account list");
            self.users.refresh();
        }
    }
}

/// Fixed uid to name table.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    names: HashMap<String, String>,
}

impl StaticAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uid: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(uid.into(), name.into());
        self
    }
}

impl AccountDirectory for StaticAccounts {
    fn user_name(&self, uid: &str) -> Option<String> {
        self.names.get(uid.trim()).cloned()
    }
}

impl<T: AccountDirectory + ?Sized> AccountDirectory for &T {
    fn user_name(&self, uid: &str) -> Option<String> {
        (**self).user_name(uid)
    }
}
