//! Agent client over the socket.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::{debug, instrument, trace};
use zeroize::Zeroizing;

use warden_core::{
    AgentStatus, ClientSecret, ContextId, CredentialAgent, Error, LoginOutcome, Password, Result,
    Session, TotpCode,
};

use super::messages::{Operation, Request, Response};

/// A [`CredentialAgent`] living in another process.
///
/// Every call opens a fresh connection, so a restarted daemon is picked up
/// without reconnect logic. Timeouts are the session client's job.
#[derive(Debug, Clone)]
pub struct IpcAgent {
    socket_path: PathBuf,
}

impl IpcAgent {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn call(&self, context: &ContextId, op: Operation) -> Result<Response> {
        let name = op.name();

        if !self.socket_path.exists() {
            return Err(Error::agent_unreachable(format!(
                "no agent socket at {}",
                self.socket_path.display()
            )));
        }

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| Error::agent_unreachable(format!("connect failed: {e}")))?;
        let (reader, mut writer) = stream.into_split();

        let request = Request {
            context: context.clone(),
            op,
        };
        let mut frame = Zeroizing::new(
            serde_json::to_vec(&request)
                .map_err(|e| Error::agent_unreachable(format!("encode failed: {e}")))?,
        );
        frame.push(b'\n');

        trace!(op = name, "Sending request");
        writer
            .write_all(&frame)
            .await
            .map_err(|e| Error::agent_unreachable(format!("send failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::agent_unreachable(format!("send failed: {e}")))?;

        let mut line = String::new();
        let read = BufReader::new(reader)
            .read_line(&mut line)
            .await
            .map_err(|e| Error::agent_unreachable(format!("receive failed: {e}")))?;
        if read == 0 {
            return Err(Error::agent_unreachable("agent closed the connection"));
        }

        let response: Response = serde_json::from_str(&line)
            .map_err(|e| Error::agent_unreachable(format!("bad response: {e}")))?;

        match response {
            Response::Error(e) => {
                debug!(op = name, kind = %e.kind(), "Agent returned error");
                Err(e)
            }
            other => Ok(other),
        }
    }

    async fn expect_ok(&self, context: &ContextId, op: Operation) -> Result<()> {
        match self.call(context, op).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn expect_session(&self, context: &ContextId, op: Operation) -> Result<Session> {
        match self.call(context, op).await? {
            Response::Session(session) => Ok(session),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> Error {
    let kind = match response {
        Response::Ok => "ok",
        Response::Outcome(_) => "outcome",
        Response::Session(_) => "session",
        Response::Status(_) => "status",
        Response::Error(_) => "error",
    };
    Error::agent_unreachable(format!("unexpected '{kind}' response"))
}

#[async_trait]
impl CredentialAgent for IpcAgent {
    async fn ping(&self) -> Result<()> {
        self.expect_ok(&ContextId::default(), Operation::Ping).await
    }

    #[instrument(skip(self), fields(%context))]
    async fn set_server(&self, context: &ContextId, url: &str) -> Result<()> {
        self.expect_ok(
            context,
            Operation::SetServer {
                url: url.to_string(),
            },
        )
        .await
    }

    #[instrument(skip(self), fields(%context))]
    async fn set_client_id(&self, context: &ContextId, client_id: &str) -> Result<()> {
        self.expect_ok(
            context,
            Operation::SetClientId {
                client_id: client_id.to_string(),
            },
        )
        .await
    }

    #[instrument(skip(self, secret), fields(%context))]
    async fn set_client_secret(&self, context: &ContextId, secret: ClientSecret) -> Result<()> {
        self.expect_ok(context, Operation::SetClientSecret { secret })
            .await
    }

    #[instrument(skip(self, password, totp), fields(%context))]
    async fn login_with_password(
        &self,
        context: &ContextId,
        email: &str,
        password: Password,
        totp: Option<TotpCode>,
    ) -> Result<LoginOutcome> {
        let op = Operation::Login {
            email: email.to_string(),
            password,
            totp,
        };
        match self.call(context, op).await? {
            Response::Outcome(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    #[instrument(skip(self, code), fields(%context))]
    async fn submit_totp(&self, context: &ContextId, code: TotpCode) -> Result<Session> {
        self.expect_session(context, Operation::SubmitTotp { code })
            .await
    }

    #[instrument(skip(self), fields(%context))]
    async fn lock(&self, context: &ContextId) -> Result<()> {
        self.expect_ok(context, Operation::Lock).await
    }

    #[instrument(skip(self, secret), fields(%context))]
    async fn unlock(&self, context: &ContextId, secret: Password) -> Result<Session> {
        self.expect_session(context, Operation::Unlock { secret })
            .await
    }

    #[instrument(skip(self), fields(%context))]
    async fn logout(&self, context: &ContextId) -> Result<()> {
        self.expect_ok(context, Operation::Logout).await
    }

    async fn status(&self, context: &ContextId) -> Result<AgentStatus> {
        match self.call(context, Operation::Status).await? {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(&other)),
        }
    }
}
