use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::error::AuthError;
use super::provider::{AuthJson, IdentityProvider, UserHandle};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

const CURRENT_USER_PATH: &str = "/api/v1/users/me";
const REFRESH_PATH: &str = "/api/v1/auth/sessions/current/refresh";

/// Tokens of the signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The stored session plus a counter bumped on every sign-in and sign-out.
/// A token refresh keeps the generation.
#[derive(Debug, Default)]
struct SessionSlot {
    generation: u64,
    session: Option<StackSession>,
}

type SharedSession = Arc<RwLock<SessionSlot>>;

/// Stack Auth client-side app talking to the Stack REST API.
///
/// Holds the session in memory only; the host is responsible for obtaining
/// tokens (e.g. from the hosted sign-in flow) and handing them over through
/// [`sign_in_with_tokens`](Self::sign_in_with_tokens).
///
/// # Example
/// ```no_run
/// use stack_convex_auth::auth::StackClientApp;
///
/// let app = StackClientApp::new("project-id", "pck_publishable")
///     .with_api_url("http://localhost:8102");
/// app.sign_in_with_tokens("access", Some("refresh".to_string()));
/// ```
pub struct StackClientApp {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
    publishable_client_key: String,
    session: SharedSession,
}

impl StackClientApp {
    pub fn new(project_id: impl Into<String>, publishable_client_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: crate::config::DEFAULT_STACK_API_URL.to_string(),
            project_id: project_id.into(),
            publishable_client_key: publishable_client_key.into(),
            session: Arc::new(RwLock::new(SessionSlot::default())),
        }
    }

    /// Build from a validated [`BridgeConfig`].
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let project_id = config.stack_project_id().ok_or_else(|| {
            BridgeError::Configuration("NEXT_PUBLIC_STACK_PROJECT_ID is not set".into())
        })?;
        let key = config.stack_publishable_client_key().ok_or_else(|| {
            BridgeError::Configuration("NEXT_PUBLIC_STACK_PUBLISHABLE_CLIENT_KEY is not set".into())
        })?;
        Ok(Self::new(project_id, key).with_api_url(config.stack_api_url()))
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Adopt an existing session. Handles issued for an earlier session stop
    /// answering with tokens.
    pub fn sign_in_with_tokens(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.session = Some(StackSession {
            access_token: access_token.into(),
            refresh_token,
        });
        tracing::debug!(project_id = %self.project_id, generation = slot.generation, "Session tokens adopted");
    }

    /// Forget the current session. Later polls report no user.
    pub fn sign_out(&self) {
        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.session = None;
        tracing::debug!(project_id = %self.project_id, generation = slot.generation, "Session cleared");
    }

    pub fn session(&self) -> Option<StackSession> {
        self.current().1
    }

    fn current(&self) -> (u64, Option<StackSession>) {
        let slot = self.session.read().unwrap_or_else(PoisonError::into_inner);
        (slot.generation, slot.session.clone())
    }

    /// Replace the session only if no sign-in or sign-out happened since
    /// `generation` was read. Clearing counts as a sign-out.
    fn replace_if_current(&self, generation: u64, next: Option<StackSession>) -> bool {
        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation {
            return false;
        }
        if next.is_none() {
            slot.generation += 1;
        }
        slot.session = next;
        true
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Accept", "application/json")
            .header("x-stack-project-id", &self.project_id)
            .header("x-stack-publishable-client-key", &self.publishable_client_key)
            .header("x-stack-access-type", "client")
    }

    /// `Ok(None)` when the access token was rejected.
    async fn fetch_current_user(
        &self,
        session: &StackSession,
    ) -> Result<Option<StackUserPayload>, AuthError> {
        let mut builder = self
            .request(self.client.get(format!("{}{CURRENT_USER_PATH}", self.api_url)))
            .header("x-stack-access-token", &session.access_token);
        if let Some(refresh) = &session.refresh_token {
            builder = builder.header("x-stack-refresh-token", refresh);
        }
        let resp = builder.send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(api_error("Current user request", resp).await);
        }
        let body = resp.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Exchange the refresh token for a new access token. `Ok(None)` when the
    /// session has no refresh token, the provider rejected it, or the session
    /// was replaced while the request was in flight.
    async fn refresh_session(
        &self,
        generation: u64,
        session: &StackSession,
    ) -> Result<Option<StackSession>, AuthError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Ok(None);
        };
        let resp = self
            .request(self.client.post(format!("{}{REFRESH_PATH}", self.api_url)))
            .header("x-stack-refresh-token", refresh_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST
        ) {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(api_error("Session refresh", resp).await);
        }
        let payload: RefreshResponse = serde_json::from_str(&resp.text().await?)?;
        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "Session refresh returned an empty access token".into(),
            ));
        }
        let refreshed = StackSession {
            access_token: payload.access_token,
            refresh_token: session.refresh_token.clone(),
        };
        if !self.replace_if_current(generation, Some(refreshed.clone())) {
            tracing::debug!(project_id = %self.project_id, "Session changed during refresh; discarding token");
            return Ok(None);
        }
        tracing::debug!(project_id = %self.project_id, "Access token refreshed");
        Ok(Some(refreshed))
    }

    fn user_handle(&self, generation: u64, payload: StackUserPayload) -> Arc<dyn UserHandle> {
        Arc::new(StackUser {
            payload,
            generation,
            session: self.session.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for StackClientApp {
    async fn get_user(&self) -> Result<Option<Arc<dyn UserHandle>>, AuthError> {
        let (generation, Some(session)) = self.current() else {
            return Ok(None);
        };
        if let Some(user) = self.fetch_current_user(&session).await? {
            return Ok(Some(self.user_handle(generation, user)));
        }

        tracing::debug!(project_id = %self.project_id, "Access token rejected; refreshing session");
        let user = match self.refresh_session(generation, &session).await? {
            Some(refreshed) => self.fetch_current_user(&refreshed).await?,
            None => None,
        };
        match user {
            Some(user) => Ok(Some(self.user_handle(generation, user))),
            None => {
                if self.replace_if_current(generation, None) {
                    tracing::debug!(project_id = %self.project_id, "Session expired; signed out");
                }
                Ok(None)
            }
        }
    }
}

/// User returned by [`StackClientApp::get_user`].
///
/// Token reads go through the app's live session, so a refresh performed by a
/// later poll is visible to handles obtained earlier. Once that session is
/// signed out or replaced, the handle has no credential.
pub struct StackUser {
    payload: StackUserPayload,
    generation: u64,
    session: SharedSession,
}

#[async_trait]
impl UserHandle for StackUser {
    fn id(&self) -> &str {
        &self.payload.id
    }

    fn display_name(&self) -> Option<&str> {
        self.payload.display_name.as_deref()
    }

    fn primary_email(&self) -> Option<&str> {
        self.payload.primary_email.as_deref()
    }

    async fn get_auth_json(&self) -> Result<Option<AuthJson>, AuthError> {
        let slot = self.session.read().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != self.generation {
            return Ok(None);
        }
        Ok(slot.session.as_ref().map(|session| AuthJson {
            access_token: Some(session.access_token.clone()),
            refresh_token: session.refresh_token.clone(),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StackUserPayload {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    primary_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

async fn api_error(context: &str, resp: reqwest::Response) -> AuthError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    AuthError::Api {
        status,
        message: format!("{context} failed: {}", body.trim()),
    }
}
