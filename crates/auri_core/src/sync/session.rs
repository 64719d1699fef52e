//! Authenticated session lookup used to gate remote mirroring.

use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::RwLock;

/// Authenticated user session issued by the external auth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    /// Bearer credential sent with remote writes.
    pub access_token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Supplies the current session, if any.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<Session>;
}

/// Session holder updated by the app on sign-in and sign-out.
#[derive(Default)]
pub struct StaticSessionProvider {
    session: RwLock<Option<Session>>,
}

impl StaticSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    pub fn set_session(&self, session: Session) {
        if let Ok(mut guard) = self.session.write() {
            *guard = Some(session);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Option<Session> {
        self.snapshot()
    }
}
