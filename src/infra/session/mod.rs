//! Browser sessions for the OAuth login flow.
//!
//! Sessions only remember the pending OAuth `state` and whether the login
//! completed. Tokens never live here; they go straight to the token store.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Sessions older than this are treated as absent
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// CSRF token sent to the provider with the consent redirect
    pub oauth_state: Option<String>,
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            oauth_state: None,
            authenticated: false,
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::hours(SESSION_TTL_HOURS)
    }
}

/// Thread-safe session map keyed by session ID
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live session for `id`; expired sessions are dropped on access.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id).map(|entry| entry.value().clone())?;
        if session.is_expired(Utc::now()) {
            self.sessions.remove(id);
            debug!(session_id = %id, "Session expired");
            return None;
        }
        Some(session)
    }

    /// Existing live session, or a freshly created one.
    pub fn get_or_create(&self, id: Option<&str>) -> Session {
        if let Some(session) = id.and_then(|id| self.get(id)) {
            return session;
        }
        let session = Session::new();
        self.sessions.insert(session.id.clone(), session.clone());
        debug!(session_id = %session.id, "Session created");
        session
    }

    /// Generate and remember a new OAuth state for the session.
    pub fn begin_login(&self, id: &str) -> Option<String> {
        let mut entry = self.sessions.get_mut(id)?;
        let state = Uuid::new_v4().simple().to_string();
        entry.oauth_state = Some(state.clone());
        Some(state)
    }

    /// Consume the pending OAuth state; true only if it matches `state`.
    pub fn verify_state(&self, id: &str, state: &str) -> bool {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return false;
        };
        match entry.oauth_state.take() {
            Some(expected) => expected == state,
            None => false,
        }
    }

    pub fn mark_authenticated(&self, id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.authenticated = true;
            info!(session_id = %id, "Session authenticated");
        }
    }

    pub fn is_authenticated(&self, id: &str) -> bool {
        self.get(id).is_some_and(|s| s.authenticated)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        before - self.sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, hours: i64) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.created_at = entry.created_at - Duration::hours(hours);
        }
    }
}
