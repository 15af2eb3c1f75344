//! Session state injected into the API client and the query cache.

use log::{debug, info};
use std::sync::RwLock;

/// Read access to the current session plus the ability to end it.
#[cfg_attr(test, mockall::automock)]
pub trait AuthState: Send + Sync {
    /// Current session token, if signed in.
    fn session_id(&self) -> Option<String>;

    /// Ends the session. Called when the backend rejects the token.
    fn logout(&self);
}

/// In-memory session holder.
#[derive(Debug, Default)]
pub struct SessionStore {
    session_id: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session_id: RwLock::new(Some(token.into())),
        }
    }

    /// Replaces the session token. Calls already in flight keep the token they started with.
    pub fn set_session_id(&self, token: Option<String>) {
        debug!("Session token {}", if token.is_some() { "updated" } else { "cleared" });
        *self.session_id.write().unwrap() = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_id.read().unwrap().is_some()
    }
}

impl AuthState for SessionStore {
    fn session_id(&self) -> Option<String> {
        self.session_id.read().unwrap().clone()
    }

    fn logout(&self) {
        info!("Session rejected by the server, logging out");
        *self.session_id.write().unwrap() = None;
    }
}
