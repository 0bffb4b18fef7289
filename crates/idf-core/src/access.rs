//! Owner/admin authorization.
//!
//! Handlers call a guard before running a privileged command; nothing below
//! the command layer checks permissions again.

use std::sync::Arc;

use tracing::warn;

use crate::{domain::UserId, ports::AdminRegistry, utils::now_ts, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denied {
    NotOwner,
    NotAdmin,
}

impl Denied {
    /// Reply shown to the caller.
    pub fn message(self) -> &'static str {
        match self {
            Denied::NotOwner => "You are not authorized to use this command. Owner only.",
            Denied::NotAdmin => "You are not an admin.",
        }
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    owner: UserId,
    admins: Arc<dyn AdminRegistry>,
}

impl AccessGuard {
    pub fn new(owner: UserId, admins: Arc<dyn AdminRegistry>) -> Self {
        Self { owner, admins }
    }

    pub fn is_owner(&self, user: Option<UserId>) -> bool {
        user == Some(self.owner)
    }

    /// Make sure the owner is listed in the admin table (added by `0`).
    pub async fn register_owner(&self) -> Result<()> {
        self.admins
            .add_admin(self.owner, UserId(0), now_ts())
            .await
    }

    pub fn require_owner(&self, user: Option<UserId>) -> std::result::Result<(), Denied> {
        if self.is_owner(user) {
            Ok(())
        } else {
            Err(Denied::NotOwner)
        }
    }

    /// Owner, or anyone in the admin registry. A registry failure denies.
    pub async fn require_admin(&self, user: Option<UserId>) -> std::result::Result<(), Denied> {
        let Some(user) = user else {
            return Err(Denied::NotAdmin);
        };
        if user == self.owner {
            return Ok(());
        }
        match self.admins.is_admin(user).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Denied::NotAdmin),
            Err(e) => {
                warn!(user = %user, error = %e, "admin lookup failed");
                Err(Denied::NotAdmin)
            }
        }
    }
}
