//! Identity provider seam.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Token payload returned by [`UserHandle::get_auth_json`].
///
/// Either field may be absent; a payload without `access_token` is treated as
/// "no credential available".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthJson {
    /// The access token, if present and non-empty.
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A signed-in user as seen by the identity provider.
#[async_trait]
pub trait UserHandle: Send + Sync {
    /// Stable identifier of the user. Two handles with the same id refer to
    /// the same account.
    fn id(&self) -> &str;

    /// Human-readable name, when the provider knows one.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Primary email, when the provider knows one.
    fn primary_email(&self) -> Option<&str> {
        None
    }

    /// Current token payload for this user's session.
    async fn get_auth_json(&self) -> Result<Option<AuthJson>, AuthError>;
}

impl fmt::Debug for dyn UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserHandle").field("id", &self.id()).finish()
    }
}

/// Source of the current user.
///
/// Implementations must tolerate concurrent `get_user` calls: overlapping polls
/// and token refreshes may call it at the same time.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the currently signed-in user, or `None` when anonymous.
    async fn get_user(&self) -> Result<Option<Arc<dyn UserHandle>>, AuthError>;
}
