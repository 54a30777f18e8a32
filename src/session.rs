//! Session collaborator.
//!
//! The client never manages login itself. It asks a [`SessionProvider`] for a
//! bearer credential before each call, and tells it to drop the session when
//! a protected endpoint answers 401.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

/// Source of the bearer credential attached to outbound requests.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current bearer token, if signed in.
    async fn bearer_token(&self) -> Option<String>;

    /// Forget the current session (called after a protected 401).
    async fn clear(&self);
}

/// Anonymous access: never sends an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl SessionProvider for NoSession {
    async fn bearer_token(&self) -> Option<String> {
        None
    }

    async fn clear(&self) {}
}

/// In-memory token holder.
///
/// ```rust
/// # use devsocial::StaticSession;
/// let session = StaticSession::new("token-123");
/// assert_eq!(session.token().as_deref(), Some("token-123"));
/// ```
#[derive(Debug, Default)]
pub struct StaticSession {
    token: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn bearer_token(&self) -> Option<String> {
        self.token()
    }

    async fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Callback fired with the endpoint after a protected 401 has cleared the
/// session. UIs use it to redirect to sign-in.
pub type UnauthorizedHook = Arc<dyn Fn(&str) + Send + Sync>;
