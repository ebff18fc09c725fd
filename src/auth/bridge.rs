//! The adapter handed to the reactive backend client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::fetcher::{FetchTokenOptions, TokenFetcher};
use super::provider::IdentityProvider;
use super::snapshot::SessionSnapshot;
use super::tracker::SessionTracker;
use crate::config::BridgeConfig;

/// Auth contract consumed by a reactive backend client.
///
/// The client suspends queries while `is_loading`, runs them unauthenticated
/// when `is_authenticated` is false, and calls `fetch_access_token` whenever
/// it must (re)attach credentials. `fetch_access_token` is infallible: `None`
/// means "no credential for this call".
#[async_trait]
pub trait ReactiveAuth: Send + Sync {
    fn is_loading(&self) -> bool;

    fn is_authenticated(&self) -> bool;

    async fn fetch_access_token(&self, options: FetchTokenOptions) -> Option<String>;
}

/// Immutable auth value derived from one session snapshot.
///
/// Equal states (same flags, same user id) compare equal, so a host can keep
/// the previous value and skip re-subscribing its backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    is_loading: bool,
    is_authenticated: bool,
    fetcher: TokenFetcher,
}

impl AuthState {
    pub fn new(provider: Arc<dyn IdentityProvider>, snapshot: &SessionSnapshot) -> Self {
        Self {
            is_loading: snapshot.is_loading(),
            is_authenticated: snapshot.is_authenticated(),
            fetcher: TokenFetcher::new(provider, snapshot),
        }
    }

    pub fn fetcher(&self) -> &TokenFetcher {
        &self.fetcher
    }
}

#[async_trait]
impl ReactiveAuth for AuthState {
    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    async fn fetch_access_token(&self, options: FetchTokenOptions) -> Option<String> {
        self.fetcher.fetch_access_token(options).await
    }
}

/// Bridges an identity provider session into the [`ReactiveAuth`] contract.
///
/// Created in the loading state; [`install`](Self::install) starts polling
/// and [`teardown`](Self::teardown) (or dropping the bridge) stops it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use stack_convex_auth::auth::{FetchTokenOptions, ReactiveAuth, StackAuthBridge, StackClientApp};
/// use stack_convex_auth::config::BridgeConfig;
///
/// # async fn example() -> stack_convex_auth::error::Result<()> {
/// let config = BridgeConfig::from_env();
/// config.validate()?;
/// let app = Arc::new(StackClientApp::from_config(&config)?);
/// let bridge = StackAuthBridge::from_config(app, &config);
/// bridge.install();
/// bridge.wait_until_loaded().await;
/// if bridge.is_authenticated() {
///     let token = bridge.fetch_access_token(FetchTokenOptions::cached()).await;
///     println!("{token:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct StackAuthBridge {
    provider: Arc<dyn IdentityProvider>,
    tracker: SessionTracker,
}

impl StackAuthBridge {
    pub fn new(provider: Arc<dyn IdentityProvider>, poll_interval: Duration) -> Self {
        let tracker = SessionTracker::new(provider.clone(), poll_interval);
        Self { provider, tracker }
    }

    /// Build a bridge using the configured poll interval.
    pub fn from_config(provider: Arc<dyn IdentityProvider>, config: &BridgeConfig) -> Self {
        Self::new(provider, config.poll_interval())
    }

    /// Start tracking the session. See [`SessionTracker::install`].
    pub fn install(&self) -> bool {
        self.tracker.install()
    }

    /// Stop tracking the session. See [`SessionTracker::teardown`].
    pub fn teardown(&self) -> bool {
        self.tracker.teardown()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tracker.snapshot()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.tracker.watch()
    }

    /// Auth value for the current snapshot.
    pub fn auth_state(&self) -> AuthState {
        AuthState::new(self.provider.clone(), &self.tracker.snapshot())
    }

    /// Wait until the first poll has completed and return that snapshot.
    ///
    /// Only resolves once the bridge is installed; a bridge torn down before
    /// its first poll completes stays loading forever.
    pub async fn wait_until_loaded(&self) -> SessionSnapshot {
        let mut rx = self.tracker.watch();
        let loaded = match rx.wait_for(|snapshot| !snapshot.is_loading()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.tracker.snapshot(),
        };
        loaded
    }
}

#[async_trait]
impl ReactiveAuth for StackAuthBridge {
    fn is_loading(&self) -> bool {
        self.tracker.snapshot().is_loading()
    }

    fn is_authenticated(&self) -> bool {
        self.tracker.snapshot().is_authenticated()
    }

    async fn fetch_access_token(&self, options: FetchTokenOptions) -> Option<String> {
        let fetcher = TokenFetcher::new(self.provider.clone(), &self.tracker.snapshot());
        fetcher.fetch_access_token(options).await
    }
}
