//! Wire frames exchanged over the agent socket.
//!
//! One JSON object per line in each direction. Requests carry secrets, so
//! neither type implements `Debug` beyond the operation name.

use serde::{Deserialize, Serialize};

use warden_core::{
    AgentStatus, ClientSecret, ContextId, Error, LoginOutcome, Password, Session, TotpCode,
};

/// A request for one agent operation on one context.
#[derive(Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub context: ContextId,
    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Ping,
    SetServer {
        url: String,
    },
    SetClientId {
        client_id: String,
    },
    SetClientSecret {
        secret: ClientSecret,
    },
    Login {
        email: String,
        password: Password,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        totp: Option<TotpCode>,
    },
    SubmitTotp {
        code: TotpCode,
    },
    Lock,
    Unlock {
        secret: Password,
    },
    Logout,
    Status,
}

impl Operation {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::SetServer { .. } => "set_server",
            Operation::SetClientId { .. } => "set_client_id",
            Operation::SetClientSecret { .. } => "set_client_secret",
            Operation::Login { .. } => "login",
            Operation::SubmitTotp { .. } => "submit_totp",
            Operation::Lock => "lock",
            Operation::Unlock { .. } => "unlock",
            Operation::Logout => "logout",
            Operation::Status => "status",
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("context", &self.context)
            .field("op", &self.op.name())
            .finish()
    }
}

/// The agent's answer to one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Outcome(LoginOutcome),
    Session(Session),
    Status(AgentStatus),
    Error(Error),
}

impl From<warden_core::Result<()>> for Response {
    fn from(result: warden_core::Result<()>) -> Self {
        match result {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error(e),
        }
    }
}

impl From<warden_core::Result<LoginOutcome>> for Response {
    fn from(result: warden_core::Result<LoginOutcome>) -> Self {
        match result {
            Ok(outcome) => Response::Outcome(outcome),
            Err(e) => Response::Error(e),
        }
    }
}

impl From<warden_core::Result<Session>> for Response {
    fn from(result: warden_core::Result<Session>) -> Self {
        match result {
            Ok(session) => Response::Session(session),
            Err(e) => Response::Error(e),
        }
    }
}

impl From<warden_core::Result<AgentStatus>> for Response {
    fn from(result: warden_core::Result<AgentStatus>) -> Self {
        match result {
            Ok(status) => Response::Status(status),
            Err(e) => Response::Error(e),
        }
    }
}
