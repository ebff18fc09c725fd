//! stack-convex-auth: Stack Auth sessions for Convex reactive clients
//!
//! Tracks an identity provider session by polling and exposes it through the
//! `{ is_loading, is_authenticated, fetch_access_token }` contract a reactive
//! backend client expects.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stack_convex_auth::prelude::*;
//!
//! # async fn example() -> stack_convex_auth::error::Result<()> {
//! let config = BridgeConfig::from_env();
//! config.validate()?;
//! let app = Arc::new(StackClientApp::from_config(&config)?);
//! let bridge = StackAuthBridge::from_config(app, &config);
//! bridge.install();
//!
//! let snapshot = bridge.wait_until_loaded().await;
//! let token = bridge
//!     .fetch_access_token(FetchTokenOptions::cached())
//!     .await;
//! println!("authenticated={} token={token:?}", snapshot.is_authenticated());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
