//! Convenience re-exports for common usage.

pub use crate::auth::{
    AuthJson, AuthState, FetchTokenOptions, IdentityProvider, ReactiveAuth, SessionSnapshot,
    StackAuthBridge, StackClientApp, UserHandle,
};
pub use crate::config::BridgeConfig;
pub use crate::error::{BridgeError, Result};
