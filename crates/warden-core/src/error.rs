//! Error types for warden.
//!
//! Every failure is classified into one of four categories before it
//! reaches a frontend: configuration, authentication, policy and transport.
//! Frontends branch on [`Error::kind`], never on message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::session::SessionState;

/// The unified error type for warden operations.
///
/// Errors are serializable so they survive the trip across the agent's IPC
/// boundary without being flattened into strings.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "category", content = "detail", rename_all = "snake_case")]
pub enum Error {
    /// Caller-correctable configuration errors. No state was mutated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// User-correctable authentication errors.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Policy errors: the caller must change input or wait.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The agent (or the server behind it) could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigError {
    /// The server URL was rejected.
    #[error("invalid server URL '{value}': {reason}")]
    InvalidServer { value: String, reason: String },
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthError {
    /// The email or password is wrong.
    #[error("bad password")]
    BadPassword,

    /// The second-factor code is wrong.
    #[error("bad TOTP code")]
    BadTotp,

    /// A TOTP code was submitted but no challenge is pending.
    #[error("no second-factor challenge is pending")]
    NoPendingChallenge,

    /// The operation is not valid in the current session state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        state: SessionState,
        operation: String,
    },
}

/// Policy errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyError {
    /// The server saw unusual traffic; API client credentials are required.
    #[error("captcha required: set a client id and client secret")]
    CaptchaRequired,

    /// Too many failed attempts; retry later.
    #[error("rate limited, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

/// Transport-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    /// The agent process or socket could not be reached.
    #[error("agent unreachable: {reason}")]
    AgentUnreachable { reason: String },

    /// The agent did not answer in time.
    #[error("agent did not respond within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The identity server failed in a way that is not a credential problem.
    #[error("backend failure: {message}")]
    Backend { message: String },
}

/// Closed classification of every [`Error`], for frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidServer,
    BadPassword,
    BadTotp,
    CaptchaRequired,
    RateLimited,
    AgentUnreachable,
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidServer => "invalid_server",
            ErrorKind::BadPassword => "bad_password",
            ErrorKind::BadTotp => "bad_totp",
            ErrorKind::CaptchaRequired => "captcha_required",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AgentUnreachable => "agent_unreachable",
            ErrorKind::InvalidState => "invalid_state",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(ConfigError::InvalidServer { .. }) => ErrorKind::InvalidServer,
            Error::Auth(AuthError::BadPassword) => ErrorKind::BadPassword,
            Error::Auth(AuthError::BadTotp) => ErrorKind::BadTotp,
            Error::Auth(AuthError::NoPendingChallenge | AuthError::InvalidState { .. }) => {
                ErrorKind::InvalidState
            }
            Error::Policy(PolicyError::CaptchaRequired) => ErrorKind::CaptchaRequired,
            Error::Policy(PolicyError::RateLimited { .. }) => ErrorKind::RateLimited,
            Error::Transport(_) => ErrorKind::AgentUnreachable,
        }
    }

    /// Shorthand for [`TransportError::AgentUnreachable`].
    pub fn agent_unreachable(reason: impl Into<String>) -> Self {
        TransportError::AgentUnreachable {
            reason: reason.into(),
        }
        .into()
    }

    /// Shorthand for [`AuthError::InvalidState`].
    pub fn invalid_state(state: SessionState, operation: impl Into<String>) -> Self {
        AuthError::InvalidState {
            state,
            operation: operation.into(),
        }
        .into()
    }

    /// Returns the suggested wait for rate-limited errors.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Error::Policy(PolicyError::RateLimited { retry_after_ms }) => {
                Some(std::time::Duration::from_millis(*retry_after_ms))
            }
            _ => None,
        }
    }

    /// Check if this is a transport-level failure rather than a credential problem.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
