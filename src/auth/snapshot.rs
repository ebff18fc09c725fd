//! Session snapshot published by the tracker.

use std::sync::Arc;

use super::provider::UserHandle;

/// Point-in-time view of the identity provider's session.
///
/// Constructed either as [`SessionSnapshot::loading`] (before any poll has
/// completed) or [`SessionSnapshot::resolved`] (after one has), so that
/// `is_authenticated` always agrees with the presence of a user once loaded.
///
/// Equality compares the observable state only: the loading flag, the
/// authenticated flag and the user id. Two polls that return different handles
/// for the same account produce equal snapshots.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    is_loading: bool,
    is_authenticated: bool,
    user: Option<Arc<dyn UserHandle>>,
}

impl SessionSnapshot {
    /// State before the first poll: loading, unauthenticated, no user.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            is_authenticated: false,
            user: None,
        }
    }

    /// State after a completed poll.
    pub fn resolved(user: Option<Arc<dyn UserHandle>>) -> Self {
        Self {
            is_loading: false,
            is_authenticated: user.is_some(),
            user,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn user(&self) -> Option<&Arc<dyn UserHandle>> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref().map(|user| user.id())
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

impl PartialEq for SessionSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.is_loading == other.is_loading
            && self.is_authenticated == other.is_authenticated
            && self.user_id() == other.user_id()
    }
}

impl Eq for SessionSnapshot {}
