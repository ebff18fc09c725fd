//! CLI entry point for stack-convex-auth.

pub mod session;

use clap::{Args, Parser, Subcommand};

/// Stack Auth → Convex bridge CLI
#[derive(Parser, Debug)]
#[command(
    name = "stack-convex-auth",
    version,
    about = "Inspect the Stack Auth session the Convex client would see"
)]
pub struct Cli {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show identity provider and backend auth status
    Status,
    /// Print the bearer token the backend client would attach
    Token(TokenArgs),
    /// Print every session change until interrupted
    Watch(WatchArgs),
}

/// Session tokens and polling overrides shared by all commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Stack access token (falls back to STACK_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Stack refresh token (falls back to STACK_REFRESH_TOKEN)
    #[arg(long, global = true)]
    pub refresh_token: Option<String>,

    /// Poll interval in milliseconds (overrides STACK_AUTH_POLL_INTERVAL_MS)
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,
}

/// Arguments for the `token` subcommand.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Ask the identity provider for a fresh token
    #[arg(long)]
    pub force_refresh: bool,
}

/// Arguments for the `watch` subcommand.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stop after this many session changes
    #[arg(long)]
    pub changes: Option<usize>,
}
