//! # Caller Identity
//!
//! Every engine operation receives the calling [`Actor`] explicitly. There is
//! no ambient "current user": the transport layer authenticates the request,
//! builds an `Actor`, and threads it through.
//!
//! ## Roles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Role::Admin                     Role::Branch { location_id }           │
//! │  ───────────                     ────────────────────────────           │
//! │  • any location                  • only its own location                │
//! │  • approve / reject orders       • create / submit / receive orders     │
//! │  • orders start approved         • orders start as draft                │
//! │  • economic report               • sell from own sub-locations          │
//! │  • catalog & location admin                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// The role a user acts under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Staff assigned to a single branch.
    Branch { location_id: String },
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    /// Creates an administrator actor.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    /// Creates a branch actor bound to `location_id`.
    pub fn branch(user_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            role: Role::Branch {
                location_id: location_id.into(),
            },
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// The location a branch actor is bound to; `None` for admins.
    pub fn assigned_location(&self) -> Option<&str> {
        match &self.role {
            Role::Admin => None,
            Role::Branch { location_id } => Some(location_id),
        }
    }

    /// Fails with `Forbidden` unless the actor is an admin.
    pub fn require_admin(&self, action: &str) -> CoreResult<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Branch { .. } => Err(CoreError::forbidden(&self.user_id, action)),
        }
    }

    /// Fails with `Forbidden` unless the actor may act on `location_id`.
    ///
    /// Admins may act anywhere; branch actors only on their own location.
    pub fn require_location(&self, location_id: &str, action: &str) -> CoreResult<()> {
        match &self.role {
            Role::Admin => Ok(()),
            Role::Branch { location_id: own } if own == location_id => Ok(()),
            Role::Branch { .. } => Err(CoreError::forbidden(
                &self.user_id,
                format!("{action} for location {location_id}"),
            )),
        }
    }
}
