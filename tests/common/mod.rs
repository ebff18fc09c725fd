//! Shared test helpers: scripted identity provider and users.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use stack_convex_auth::auth::{AuthError, AuthJson, IdentityProvider, UserHandle};

/// A user whose token payload is fixed at construction.
pub struct MockUser {
    id: String,
    auth: Result<Option<AuthJson>, String>,
}

impl MockUser {
    pub fn with_token(id: &str, token: &str) -> Arc<dyn UserHandle> {
        Arc::new(Self {
            id: id.to_string(),
            auth: Ok(Some(AuthJson {
                access_token: Some(token.to_string()),
                refresh_token: None,
            })),
        })
    }

    pub fn without_token(id: &str) -> Arc<dyn UserHandle> {
        Arc::new(Self {
            id: id.to_string(),
            auth: Ok(Some(AuthJson::default())),
        })
    }

    pub fn failing(id: &str, message: &str) -> Arc<dyn UserHandle> {
        Arc::new(Self {
            id: id.to_string(),
            auth: Err(message.to_string()),
        })
    }
}

#[async_trait]
impl UserHandle for MockUser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_auth_json(&self) -> Result<Option<AuthJson>, AuthError> {
        self.auth.clone().map_err(AuthError::Network)
    }
}

#[derive(Clone)]
enum Reply {
    User(Option<Arc<dyn UserHandle>>),
    Fail(String),
}

/// Identity provider whose answer can be swapped mid-test.
///
/// A call answers with the reply configured when it started. An optional gate
/// holds the next `get_user` call until a permit is released.
pub struct ScriptedProvider {
    reply: Mutex<Reply>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn anonymous() -> Arc<Self> {
        Self::new(Reply::User(None))
    }

    pub fn signed_in(user: Arc<dyn UserHandle>) -> Arc<Self> {
        Self::new(Reply::User(Some(user)))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Reply::Fail(message.to_string()))
    }

    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_user(&self, user: Option<Arc<dyn UserHandle>>) {
        *self.reply.lock().expect("reply lock poisoned") = Reply::User(user);
    }

    pub fn set_failure(&self, message: &str) {
        *self.reply.lock().expect("reply lock poisoned") = Reply::Fail(message.to_string());
    }

    /// Block the next call until a permit is added to the returned gate.
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().expect("gate lock poisoned") = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn get_user(&self) -> Result<Option<Arc<dyn UserHandle>>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().expect("reply lock poisoned").clone();
        let gate = self.gate.lock().expect("gate lock poisoned").take();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match reply {
            Reply::User(user) => Ok(user),
            Reply::Fail(message) => Err(AuthError::Network(message)),
        }
    }
}
