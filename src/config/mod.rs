//! Configuration system (layered: code > env > `.env` file).

use std::time::Duration;

use crate::error::BridgeError;

/// Default identity provider API endpoint.
pub const DEFAULT_STACK_API_URL: &str = "https://api.stack-auth.com";
/// Default base URL of the host application.
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
/// Default session poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

const SIGN_IN_PATH: &str = "/handler/sign-in";
const SIGN_UP_PATH: &str = "/handler/sign-up";
const SIGN_OUT_PATH: &str = "/handler/sign-out";

/// Hosted pages owned by the identity provider that the host navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerUrls {
    pub sign_in: String,
    pub sign_up: String,
    pub sign_out: String,
}

/// Layered configuration for the auth bridge.
///
/// Resolution order:
/// 1. Values set explicitly through the `with_*` builders
/// 2. Environment variables (a `.env` file is loaded first if present)
/// 3. Built-in defaults
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    convex_url: Option<String>,
    stack_api_url: String,
    stack_project_id: Option<String>,
    stack_publishable_client_key: Option<String>,
    app_url: String,
    poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeConfig {
    /// Config with defaults only.
    pub fn new() -> Self {
        Self {
            convex_url: None,
            stack_api_url: DEFAULT_STACK_API_URL.to_string(),
            stack_project_id: None,
            stack_publishable_client_key: None,
            app_url: DEFAULT_APP_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Load from environment variables.
    ///
    /// `NEXT_PUBLIC_*` names take precedence over their unprefixed forms. An
    /// unparseable `STACK_AUTH_POLL_INTERVAL_MS` is kept as a zero interval so
    /// that [`validate`](Self::validate) reports it.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();

        config.convex_url = first_env(&["NEXT_PUBLIC_CONVEX_URL", "CONVEX_URL"]);
        config.stack_project_id =
            first_env(&["NEXT_PUBLIC_STACK_PROJECT_ID", "STACK_PROJECT_ID"]);
        config.stack_publishable_client_key = first_env(&[
            "NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY",
            "STACK_PUBLISHABLE_CLIENT_KEY",
        ]);
        if let Some(url) = first_env(&["NEXT_PUBLIC_STACK_API_URL", "STACK_API_URL"]) {
            config.stack_api_url = url;
        }
        if let Some(url) = first_env(&["NEXT_PUBLIC_APP_URL", "APP_URL"]) {
            config.app_url = url;
        }
        if let Some(raw) = first_env(&["STACK_AUTH_POLL_INTERVAL_MS"]) {
            config.poll_interval = match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring unparseable STACK_AUTH_POLL_INTERVAL_MS");
                    Duration::ZERO
                }
            };
        }

        config
    }

    pub fn with_convex_url(mut self, url: impl Into<String>) -> Self {
        self.convex_url = Some(url.into());
        self
    }

    pub fn with_stack_api_url(mut self, url: impl Into<String>) -> Self {
        self.stack_api_url = url.into();
        self
    }

    pub fn with_stack_project_id(mut self, id: impl Into<String>) -> Self {
        self.stack_project_id = Some(id.into());
        self
    }

    pub fn with_stack_publishable_client_key(mut self, key: impl Into<String>) -> Self {
        self.stack_publishable_client_key = Some(key.into());
        self
    }

    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Backend endpoint; consumed by the host that builds the backend client.
    pub fn convex_url(&self) -> Option<&str> {
        self.convex_url.as_deref()
    }

    pub fn stack_api_url(&self) -> &str {
        self.stack_api_url.trim_end_matches('/')
    }

    pub fn stack_project_id(&self) -> Option<&str> {
        self.stack_project_id.as_deref()
    }

    pub fn stack_publishable_client_key(&self) -> Option<&str> {
        self.stack_publishable_client_key.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn handler_urls(&self) -> HandlerUrls {
        let base = self.app_url.trim_end_matches('/');
        HandlerUrls {
            sign_in: format!("{base}{SIGN_IN_PATH}"),
            sign_up: format!("{base}{SIGN_UP_PATH}"),
            sign_out: format!("{base}{SIGN_OUT_PATH}"),
        }
    }

    /// Check that everything the identity provider client needs is present.
    ///
    /// The backend URL is not required here; it belongs to the host.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.poll_interval.is_zero() {
            return Err(BridgeError::Configuration(
                "STACK_AUTH_POLL_INTERVAL_MS must be a positive number of milliseconds".into(),
            ));
        }
        if self.stack_project_id.as_deref().map_or(true, str::is_empty) {
            return Err(BridgeError::Configuration(
                "NEXT_PUBLIC_STACK_PROJECT_ID is not set".into(),
            ));
        }
        if self
            .stack_publishable_client_key
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err(BridgeError::Configuration(
                "NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY is not set".into(),
            ));
        }
        if !is_http_url(self.stack_api_url()) {
            return Err(BridgeError::Configuration(format!(
                "Invalid Stack API URL: {}",
                self.stack_api_url
            )));
        }
        Ok(())
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> BridgeConfig {
        BridgeConfig::new()
            .with_stack_project_id("proj")
            .with_stack_publishable_client_key("pck")
    }

    #[test]
    fn defaults_match_hosted_setup() {
        let config = BridgeConfig::new();
        assert_eq!(config.stack_api_url(), DEFAULT_STACK_API_URL);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.convex_url(), None);
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn validate_requires_project_and_key() {
        let err = BridgeConfig::new().validate().unwrap_err();
        assert!(err.to_string().contains("NEXT_PUBLIC_STACK_PROJECT_ID"));

        let err = BridgeConfig::new()
            .with_stack_project_id("proj")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("PUBLISHABLE_CLIENT_KEY"));
    }

    #[test]
    fn validate_rejects_zero_interval_and_bad_url() {
        let err = complete()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());

        let err = complete()
            .with_stack_api_url("ftp://stack")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://stack"));
    }

    #[test]
    fn handler_urls_join_app_url() {
        let urls = BridgeConfig::new()
            .with_app_url("https://app.example.com/")
            .handler_urls();
        assert_eq!(urls.sign_in, "https://app.example.com/handler/sign-in");
        assert_eq!(urls.sign_up, "https://app.example.com/handler/sign-up");
        assert_eq!(urls.sign_out, "https://app.example.com/handler/sign-out");
    }

    #[test]
    fn stack_api_url_drops_trailing_slash() {
        let config = BridgeConfig::new().with_stack_api_url("http://localhost:8102/");
        assert_eq!(config.stack_api_url(), "http://localhost:8102");
    }
}
