//! Bearer token retrieval for the reactive backend client.

use std::fmt;
use std::sync::Arc;

use super::error::AuthError;
use super::provider::{AuthJson, IdentityProvider, UserHandle};
use super::snapshot::SessionSnapshot;

/// Options passed by the backend client on each token request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchTokenOptions {
    /// Hint that the previously returned token may be stale.
    pub force_refresh_token: bool,
}

impl FetchTokenOptions {
    pub fn cached() -> Self {
        Self {
            force_refresh_token: false,
        }
    }

    pub fn force_refresh() -> Self {
        Self {
            force_refresh_token: true,
        }
    }
}

/// Token accessor bound to the user of one session snapshot.
///
/// A fetcher never re-reads the session after it is created: a token request
/// that races a sign-out still answers for the user it was bound to.
/// Fetchers compare equal when they are bound to the same user id, which lets
/// hosts skip re-subscribing when a poll returns the same account.
#[derive(Clone)]
pub struct TokenFetcher {
    provider: Arc<dyn IdentityProvider>,
    user: Option<Arc<dyn UserHandle>>,
}

impl TokenFetcher {
    /// Bind a fetcher to `snapshot`. Unauthenticated snapshots yield a fetcher
    /// that always answers `None`.
    pub fn new(provider: Arc<dyn IdentityProvider>, snapshot: &SessionSnapshot) -> Self {
        let user = if snapshot.is_authenticated() {
            snapshot.user().cloned()
        } else {
            None
        };
        Self { provider, user }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref().map(|user| user.id())
    }

    /// Resolve a bearer token, or `None` when no credential can be attached.
    ///
    /// Never fails: provider errors are logged and mapped to `None`. A failed
    /// or empty forced refresh falls back to the token already held.
    pub async fn fetch_access_token(&self, options: FetchTokenOptions) -> Option<String> {
        let user = self.user.as_ref()?;

        let auth_json = match user.get_auth_json().await {
            Ok(auth_json) => auth_json,
            Err(e) => {
                tracing::error!(user_id = user.id(), error = %e, "Error fetching access token");
                return None;
            }
        };
        let Some(token) = auth_json.as_ref().and_then(AuthJson::bearer) else {
            tracing::debug!(user_id = user.id(), "No access token available");
            return None;
        };

        if options.force_refresh_token {
            tracing::debug!(user_id = user.id(), "Force refresh requested");
            match self.refreshed_token().await {
                Ok(Some(fresh)) => return Some(fresh),
                Ok(None) => {
                    tracing::debug!("Refresh yielded no token; keeping current one");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error during force refresh; keeping current token");
                }
            }
        }

        Some(token.to_string())
    }

    async fn refreshed_token(&self) -> Result<Option<String>, AuthError> {
        let Some(fresh_user) = self.provider.get_user().await? else {
            return Ok(None);
        };
        let auth_json = fresh_user.get_auth_json().await?;
        Ok(auth_json
            .as_ref()
            .and_then(AuthJson::bearer)
            .map(str::to_string))
    }
}

impl PartialEq for TokenFetcher {
    fn eq(&self, other: &Self) -> bool {
        self.user_id() == other.user_id()
    }
}

impl Eq for TokenFetcher {}

impl fmt::Debug for TokenFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFetcher")
            .field("user_id", &self.user_id())
            .finish()
    }
}
