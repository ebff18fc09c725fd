//! CLI handlers for status, token, and watch.

use std::sync::Arc;
use std::time::Duration;

use super::SessionArgs;
use crate::auth::{FetchTokenOptions, ReactiveAuth, SessionSnapshot, StackAuthBridge, StackClientApp};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// How long to wait for the first session check before giving up.
const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

struct Session {
    config: BridgeConfig,
    bridge: StackAuthBridge,
}

fn connect(args: &SessionArgs) -> Result<Session, BridgeError> {
    let mut config = BridgeConfig::from_env();
    if let Some(ms) = args.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    config.validate()?;

    let app = StackClientApp::from_config(&config)?;
    let access_token = args
        .access_token
        .clone()
        .or_else(|| std::env::var("STACK_ACCESS_TOKEN").ok());
    let refresh_token = args
        .refresh_token
        .clone()
        .or_else(|| std::env::var("STACK_REFRESH_TOKEN").ok());
    match (access_token, refresh_token) {
        (Some(access), refresh) => app.sign_in_with_tokens(access, refresh),
        // An expired access token is refreshed on the first poll.
        (None, Some(refresh)) => app.sign_in_with_tokens(String::new(), Some(refresh)),
        (None, None) => {}
    }

    let bridge = StackAuthBridge::from_config(Arc::new(app), &config);
    bridge.install();
    Ok(Session { config, bridge })
}

async fn load(bridge: &StackAuthBridge) -> Result<SessionSnapshot, BridgeError> {
    tokio::time::timeout(LOAD_TIMEOUT, bridge.wait_until_loaded())
        .await
        .map_err(|_| {
            BridgeError::InvalidState(format!(
                "Session check did not complete within {}s",
                LOAD_TIMEOUT.as_secs()
            ))
        })
}

/// Handle `stack-convex-auth status`.
pub async fn handle_status(args: &SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let Session { config, bridge } = connect(args)?;
    let snapshot = load(&bridge).await?;

    println!("Stack Auth");
    match snapshot.user() {
        Some(user) => {
            println!("  ✅ Authenticated");
            println!("  User ID: {}", user.id());
            println!("  Email: {}", user.primary_email().unwrap_or("-"));
            println!("  Display Name: {}", user.display_name().unwrap_or("-"));
        }
        None => println!("  ❌ Not authenticated"),
    }

    println!("Convex");
    println!("  URL: {}", config.convex_url().unwrap_or("(NEXT_PUBLIC_CONVEX_URL not set)"));
    let auth = bridge.auth_state();
    if auth.is_loading() {
        println!("  ⏳ Loading authentication...");
    } else if auth.is_authenticated() {
        let has_token = auth
            .fetch_access_token(FetchTokenOptions::cached())
            .await
            .is_some();
        println!(
            "  ✅ Authenticated ({})",
            if has_token { "token available" } else { "no token" }
        );
    } else {
        println!("  ❌ Not authenticated");
    }

    let urls = config.handler_urls();
    if snapshot.is_authenticated() {
        println!("Sign out: {}", urls.sign_out);
    } else {
        println!("Sign in: {}", urls.sign_in);
        println!("Sign up: {}", urls.sign_up);
    }

    bridge.teardown();
    Ok(())
}

/// Handle `stack-convex-auth token`.
pub async fn handle_token(
    args: &SessionArgs,
    force_refresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let Session { bridge, .. } = connect(args)?;
    load(&bridge).await?;

    let options = FetchTokenOptions {
        force_refresh_token: force_refresh,
    };
    let token = bridge.fetch_access_token(options).await;
    bridge.teardown();

    match token {
        Some(token) => {
            println!("{token}");
            Ok(())
        }
        None => Err(BridgeError::Authentication("No access token available".into()).into()),
    }
}

/// Handle `stack-convex-auth watch`.
pub async fn handle_watch(
    args: &SessionArgs,
    max_changes: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Session { bridge, .. } = connect(args)?;
    let mut rx = bridge.watch_snapshot();
    print_snapshot(&rx.borrow_and_update());

    let mut seen = 0usize;
    while max_changes.map_or(true, |max| seen < max) {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_snapshot(&rx.borrow_and_update());
                seen += 1;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(BridgeError::from)?;
                break;
            }
        }
    }

    bridge.teardown();
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!(
        "loading={} authenticated={} user={}",
        snapshot.is_loading(),
        snapshot.is_authenticated(),
        snapshot.user_id().unwrap_or("-")
    );
}
