//! Access
//!
//! Guest vs. signed-in member. There is no credential check: signing in just
//! records the user in the store.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{self, StorageError, StorageKey, Store};

/// Signed-in user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    pub name: String,

    /// Role shown under the name, e.g. "Collector"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    /// Create a user with no role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
        }
    }

    /// Initials for the avatar badge, `U` when the name is blank.
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect();

        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }

    /// Role label, `Member` when unset.
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or("Member")
    }
}

/// Access level without the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Browse-only guest
    Guest,

    /// Signed-in member
    Member,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessMode::Guest => "guest",
            AccessMode::Member => "member",
        })
    }
}

/// Current access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Access {
    /// Browse-only guest
    #[default]
    Guest,

    /// Signed-in member
    Member(User),
}

impl Access {
    /// Access level.
    pub fn mode(&self) -> AccessMode {
        match self {
            Access::Guest => AccessMode::Guest,
            Access::Member(_) => AccessMode::Member,
        }
    }

    /// Whether this is a guest session.
    pub fn is_guest(&self) -> bool {
        matches!(self, Access::Guest)
    }

    /// Signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Access::Guest => None,
            Access::Member(user) => Some(user),
        }
    }

    /// Scanner and listing creation need a member.
    pub fn can_use_scanner(&self) -> bool {
        !self.is_guest()
    }

    /// The "My Listings" page needs a member.
    pub fn can_view_own_listings(&self) -> bool {
        !self.is_guest()
    }
}

/// Access session backed by the store.
pub struct AuthSession {
    access: Access,
    store: Arc<dyn Store>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Start a session. Sessions always start as guest, so any stored user and
    /// scanner-created listing are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the stale keys cannot be removed.
    pub fn start(store: Arc<dyn Store>) -> Result<Self, StorageError> {
        storage::clear(store.as_ref(), StorageKey::User)?;
        storage::clear(store.as_ref(), StorageKey::UserListing)?;

        Ok(Self {
            access: Access::Guest,
            store,
        })
    }

    /// Current access.
    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Sign in as `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be stored.
    pub fn login(&mut self, user: User) -> Result<&Access, StorageError> {
        storage::write(self.store.as_ref(), StorageKey::User, &user)?;

        info!(user = %user.name, "signed in");

        self.access = Access::Member(user);

        Ok(&self.access)
    }

    /// Sign out and return to guest mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored user cannot be removed.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        storage::clear(self.store.as_ref(), StorageKey::User)?;

        if let Access::Member(user) = &self.access {
            info!(user = %user.name, "signed out");
        }

        self.access = Access::Guest;

        Ok(())
    }
}
