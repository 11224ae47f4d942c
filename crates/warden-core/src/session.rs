//! Session state and the values the agent hands back to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ServerUrl, SessionHandle};

/// The states of a context's session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session. The initial state.
    #[default]
    Unauthenticated,
    /// The password was accepted and a second factor is pending.
    AwaitingSecondFactor,
    /// A session is live.
    Authenticated,
    /// The user is still logged in but must unlock before use.
    Locked,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::AwaitingSecondFactor => "awaiting second factor",
            SessionState::Authenticated => "authenticated",
            SessionState::Locked => "locked",
        };
        f.write_str(name)
    }
}

/// The client-visible outcome of a successful authentication.
///
/// Contains no secrets; the agent keeps the backend tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub handle: SessionHandle,
    pub created_at: DateTime<Utc>,
    pub authenticated: bool,
}

impl Session {
    /// Create a fresh authenticated session with a new handle.
    pub fn new() -> Self {
        Self {
            handle: SessionHandle::generate(),
            created_at: Utc::now(),
            authenticated: true,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a password login that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "session", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Fully authenticated.
    Authenticated(Session),
    /// The password was accepted; submit a TOTP code to finish.
    SecondFactorRequired,
}

impl LoginOutcome {
    /// Returns the session if authentication completed.
    pub fn session(&self) -> Option<&Session> {
        match self {
            LoginOutcome::Authenticated(session) => Some(session),
            LoginOutcome::SecondFactorRequired => None,
        }
    }
}

/// A consistent, read-only snapshot of one context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentStatus {
    pub state: SessionState,
    pub server_url: Option<ServerUrl>,
    pub has_client_id: bool,
    pub has_client_secret: bool,
    pub captcha_pending: bool,
    pub session: Option<Session>,
}
