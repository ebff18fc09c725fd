//! Identity provider session tracking and the reactive-client auth adapter.

pub mod bridge;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod snapshot;
pub mod stack;
pub mod tracker;

pub use bridge::{AuthState, ReactiveAuth, StackAuthBridge};
pub use error::AuthError;
pub use fetcher::{FetchTokenOptions, TokenFetcher};
pub use provider::{AuthJson, IdentityProvider, UserHandle};
pub use snapshot::SessionSnapshot;
pub use stack::{StackClientApp, StackSession, StackUser};
pub use tracker::{PollHandle, SessionTracker};
