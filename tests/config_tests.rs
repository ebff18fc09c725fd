//! Tests for environment-driven configuration.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pretty_assertions::assert_eq;
use stack_convex_auth::config::{BridgeConfig, HandlerUrls, DEFAULT_STACK_API_URL};
use stack_convex_auth::error::BridgeError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 11] = [
    "NEXT_PUBLIC_CONVEX_URL",
    "CONVEX_URL",
    "NEXT_PUBLIC_STACK_PROJECT_ID",
    "STACK_PROJECT_ID",
    "NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY",
    "STACK_PUBLISHABLE_CLIENT_KEY",
    "NEXT_PUBLIC_STACK_API_URL",
    "STACK_API_URL",
    "NEXT_PUBLIC_APP_URL",
    "APP_URL",
    "STACK_AUTH_POLL_INTERVAL_MS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clean_env() -> (std::sync::MutexGuard<'static, ()>, EnvGuard) {
    let lock = env_lock_guard();
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    (lock, guard)
}

#[test]
fn from_env_reads_public_variables() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("NEXT_PUBLIC_CONVEX_URL", "https://happy-otter-123.convex.cloud");
    std::env::set_var("NEXT_PUBLIC_STACK_PROJECT_ID", "proj-env");
    std::env::set_var("NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY", "pck-env");
    std::env::set_var("STACK_AUTH_POLL_INTERVAL_MS", "250");

    let config = BridgeConfig::from_env();
    assert_eq!(
        config.convex_url(),
        Some("https://happy-otter-123.convex.cloud")
    );
    assert_eq!(config.stack_project_id(), Some("proj-env"));
    assert_eq!(config.stack_publishable_client_key(), Some("pck-env"));
    assert_eq!(config.stack_api_url(), DEFAULT_STACK_API_URL);
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
    assert!(config.validate().is_ok());
}

#[test]
fn public_names_win_over_unprefixed_names() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("CONVEX_URL", "https://fallback.convex.cloud");
    std::env::set_var("NEXT_PUBLIC_CONVEX_URL", "https://primary.convex.cloud");
    std::env::set_var("STACK_API_URL", "http://localhost:8102");

    let config = BridgeConfig::from_env();
    assert_eq!(config.convex_url(), Some("https://primary.convex.cloud"));
    assert_eq!(config.stack_api_url(), "http://localhost:8102");
}

#[test]
fn blank_variables_are_ignored() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("NEXT_PUBLIC_CONVEX_URL", "   ");
    std::env::set_var("CONVEX_URL", "https://fallback.convex.cloud");

    let config = BridgeConfig::from_env();
    assert_eq!(config.convex_url(), Some("https://fallback.convex.cloud"));
}

#[test]
fn unparseable_poll_interval_fails_validation() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("NEXT_PUBLIC_STACK_PROJECT_ID", "proj");
    std::env::set_var("NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY", "pck");
    std::env::set_var("STACK_AUTH_POLL_INTERVAL_MS", "soon");

    let err = BridgeConfig::from_env().validate().unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(ref msg) if msg.contains("POLL_INTERVAL")));
}

#[test]
fn missing_project_fails_validation() {
    let (_lock, _guard) = clean_env();
    let err = BridgeConfig::from_env().validate().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn explicit_values_override_environment() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("NEXT_PUBLIC_STACK_PROJECT_ID", "proj-env");

    let config = BridgeConfig::from_env()
        .with_stack_project_id("proj-code")
        .with_poll_interval(Duration::from_secs(5));
    assert_eq!(config.stack_project_id(), Some("proj-code"));
    assert_eq!(config.poll_interval(), Duration::from_secs(5));
}

#[test]
fn handler_urls_follow_app_url() {
    let (_lock, _guard) = clean_env();
    std::env::set_var("APP_URL", "https://app.example.com/");

    assert_eq!(
        BridgeConfig::from_env().handler_urls(),
        HandlerUrls {
            sign_in: "https://app.example.com/handler/sign-in".to_string(),
            sign_up: "https://app.example.com/handler/sign-up".to_string(),
            sign_out: "https://app.example.com/handler/sign-out".to_string(),
        }
    );
}
