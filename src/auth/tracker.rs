//! Polling session tracker.
//!
//! Keeps a [`SessionSnapshot`] in step with the identity provider by calling
//! [`IdentityProvider::get_user`] once on install and then on every tick of a
//! fixed interval. Every tick runs as its own task so a slow provider call
//! never delays the next one; publication is gated by a per-tick generation
//! number so an older result can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::provider::IdentityProvider;
use super::snapshot::SessionSnapshot;

/// Owns the recurring poll task. Dropping the handle stops the timer.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the timer. Polls already spawned run to completion.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug)]
enum PollState {
    Idle,
    Installed(PollHandle),
    TornDown,
}

struct Shared {
    snapshot_tx: watch::Sender<SessionSnapshot>,
    mounted: AtomicBool,
    /// Generation of the last published poll result.
    published: Mutex<u64>,
}

impl Shared {
    /// Store `next` if the tracker is still mounted and `generation` is newer
    /// than anything published so far. Watchers are only notified when the
    /// observable state changed.
    fn publish(&self, generation: u64, next: SessionSnapshot) -> bool {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.mounted.load(Ordering::SeqCst) {
            tracing::debug!(generation, "Discarding poll result after teardown");
            return false;
        }
        if generation <= *published {
            tracing::debug!(
                generation,
                published = *published,
                "Discarding stale poll result"
            );
            return false;
        }
        *published = generation;
        self.snapshot_tx.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
        true
    }
}

/// Tracks the identity provider's session by polling.
///
/// # Example
///
/// ```ignore
/// let tracker = SessionTracker::new(provider, Duration::from_secs(1));
/// tracker.install();
/// let mut rx = tracker.watch();
/// rx.wait_for(|s| !s.is_loading()).await?;
/// tracker.teardown();
/// ```
pub struct SessionTracker {
    provider: Arc<dyn IdentityProvider>,
    poll_interval: Duration,
    shared: Arc<Shared>,
    state: Mutex<PollState>,
}

impl SessionTracker {
    /// Create a tracker in the loading state. Nothing is polled until
    /// [`install`](Self::install) is called.
    ///
    /// # Panics
    ///
    /// Panics if `poll_interval` is zero.
    pub fn new(provider: Arc<dyn IdentityProvider>, poll_interval: Duration) -> Self {
        assert!(!poll_interval.is_zero(), "poll interval must be non-zero");
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::loading());
        Self {
            provider,
            poll_interval,
            shared: Arc::new(Shared {
                snapshot_tx,
                mounted: AtomicBool::new(false),
                published: Mutex::new(0),
            }),
            state: Mutex::new(PollState::Idle),
        }
    }

    /// Start polling: one check right away, then one per interval.
    ///
    /// Returns `false` if the tracker was already installed or has been torn
    /// down; a tracker polls at most once over its lifetime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*state, PollState::Idle) {
            return false;
        }
        self.shared.mounted.store(true, Ordering::SeqCst);

        let provider = self.provider.clone();
        let shared = self.shared.clone();
        let period = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut generation = 0u64;
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                generation += 1;
                tokio::spawn(poll_once(provider.clone(), shared.clone(), generation));
            }
        });

        tracing::info!(interval_ms = period.as_millis() as u64, "Session tracker installed");
        *state = PollState::Installed(PollHandle { task });
        true
    }

    /// Stop polling and discard any result still in flight.
    ///
    /// Returns `true` if a running poll loop was stopped. Once torn down, the
    /// snapshot is frozen and the tracker cannot be reinstalled.
    pub fn teardown(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        {
            // Hold the publication lock so no poll can publish after we return.
            let _published = self
                .shared
                .published
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared.mounted.store(false, Ordering::SeqCst);
        }
        match std::mem::replace(&mut *state, PollState::TornDown) {
            PollState::Installed(handle) => {
                handle.abort();
                tracing::info!("Session tracker torn down");
                true
            }
            PollState::Idle | PollState::TornDown => false,
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    ///
    /// Receivers are woken only when the loading flag, the authenticated flag
    /// or the user id changes, not on every poll.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn poll_once(provider: Arc<dyn IdentityProvider>, shared: Arc<Shared>, generation: u64) {
    let user = match provider.get_user().await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(generation, error = %e, "Error checking auth state");
            None
        }
    };
    let authenticated = user.is_some();
    if shared.publish(generation, SessionSnapshot::resolved(user)) {
        tracing::debug!(generation, authenticated, "Session poll published");
    }
}
