//! Socket server hosting an agent.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use warden_core::{CredentialAgent, Error};

use super::messages::{Operation, Request, Response};

/// Listens on a Unix socket and answers requests with an agent.
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Bind the socket, replacing a stale one left by a previous run.
    ///
    /// The socket is only accessible to the current user.
    pub fn bind(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let listener = UnixListener::bind(&path)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;

        info!(path = %path.display(), "Agent socket bound");
        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve connections until `shutdown` resolves.
    pub async fn serve(
        self,
        agent: Arc<dyn CredentialAgent>,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing socket");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, _) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let agent = Arc::clone(&agent);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, agent).await {
                            debug!(error = %e, "Connection closed with error");
                        }
                    });
                }
            }
        }

        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(error = %e, "Could not remove socket");
        }
        Ok(())
    }
}

#[instrument(skip_all)]
async fn handle_connection(
    stream: UnixStream,
    agent: Arc<dyn CredentialAgent>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let mut line = Zeroizing::new(String::new());
        if reader.read_line(&mut line).await? == 0 {
            debug!("Client disconnected");
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(context = %request.context, op = request.op.name(), "Request");
                dispatch(agent.as_ref(), request).await
            }
            Err(e) => {
                warn!(error = %e, "Malformed request");
                Response::Error(Error::agent_unreachable(format!("malformed request: {e}")))
            }
        };

        let mut frame = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
}

async fn dispatch(agent: &dyn CredentialAgent, request: Request) -> Response {
    let context = &request.context;
    match request.op {
        Operation::Ping => agent.ping().await.into(),
        Operation::SetServer { url } => agent.set_server(context, &url).await.into(),
        Operation::SetClientId { client_id } => {
            agent.set_client_id(context, &client_id).await.into()
        }
        Operation::SetClientSecret { secret } => {
            agent.set_client_secret(context, secret).await.into()
        }
        Operation::Login {
            email,
            password,
            totp,
        } => agent
            .login_with_password(context, &email, password, totp)
            .await
            .into(),
        Operation::SubmitTotp { code } => agent.submit_totp(context, code).await.into(),
        Operation::Lock => agent.lock(context).await.into(),
        Operation::Unlock { secret } => agent.unlock(context, secret).await.into(),
        Operation::Logout => agent.logout(context).await.into(),
        Operation::Status => agent.status(context).await.into(),
    }
}
