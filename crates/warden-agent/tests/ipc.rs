//! End-to-end tests over the agent socket.

#![cfg(unix)]

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::oneshot;

use warden_agent::LocalAgent;
use warden_agent::ipc::{IpcAgent, IpcServer};
use warden_core::error::AuthError;
use warden_core::{
    AccessToken, AgentConfig, BackendOutcome, ClientConfig, ErrorKind, IdentityBackend,
    LoginOutcome, LoginRequest, Password, Result, ServerConfig, SessionClient, SessionState,
    TotpCode,
};

/// Accepts "pw" and demands the code "123456".
struct TwoFactorBackend;

#[async_trait]
impl IdentityBackend for TwoFactorBackend {
    async fn authenticate(
        &self,
        _server: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> Result<BackendOutcome> {
        if request.password.expose_secret() != "pw" {
            return Err(AuthError::BadPassword.into());
        }
        match request.totp.map(|c| c.expose_secret()) {
            None => Ok(BackendOutcome::SecondFactorRequired {
                providers: vec!["authenticator".into()],
            }),
            Some("123456") => Ok(BackendOutcome::Authenticated {
                access_token: AccessToken::new("token"),
            }),
            Some(_) => Err(AuthError::BadTotp.into()),
        }
    }
}

struct Daemon {
    _dir: TempDir,
    socket: std::path::PathBuf,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

async fn start_daemon() -> Daemon {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("agent.sock");

    let agent = Arc::new(LocalAgent::new(
        Arc::new(TwoFactorBackend),
        AgentConfig {
            unlock_hash_cost: 4,
            ..Default::default()
        },
    ));
    let server = IpcServer::bind(&socket).unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve(agent, async {
        let _ = stopped.await;
    }));

    Daemon {
        _dir: dir,
        socket,
        stop: Some(stop),
        task,
    }
}

#[tokio::test]
async fn socket_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let daemon = start_daemon().await;
    let mode = std::fs::metadata(&daemon.socket).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn login_flow_over_socket() {
    let daemon = start_daemon().await;
    let client = SessionClient::new(
        Arc::new(IpcAgent::new(&daemon.socket)),
        ClientConfig::default(),
    );
    let conn = client.create_connection(None).await.unwrap();

    let err = conn.set_server("not a url").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidServer);

    conn.set_server("https://vault.example.com").await.unwrap();

    let err = conn
        .login_with_password("alice@example.com", Password::new("nope"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadPassword);

    let outcome = conn
        .login_with_password("alice@example.com", Password::new("pw"), None)
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::SecondFactorRequired);

    let session = conn.submit_totp(TotpCode::new("123456")).await.unwrap();

    // A second client process sees the same context.
    let other = SessionClient::new(
        Arc::new(IpcAgent::new(&daemon.socket)),
        ClientConfig::default(),
    )
    .create_connection(None)
    .await
    .unwrap();
    let status = other.status().await.unwrap();
    assert_eq!(status.state, SessionState::Authenticated);
    assert_eq!(status.session, Some(session));

    other.lock().await.unwrap();
    assert_eq!(conn.status().await.unwrap().state, SessionState::Locked);
    conn.unlock(Password::new("pw")).await.unwrap();
    conn.logout().await.unwrap();
    assert_eq!(
        conn.status().await.unwrap().state,
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn missing_socket_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let client = SessionClient::new(
        Arc::new(IpcAgent::new(dir.path().join("nothing.sock"))),
        ClientConfig::default(),
    );

    let err = client.create_connection(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AgentUnreachable);
}

#[tokio::test]
async fn stopped_daemon_is_unreachable() {
    let mut daemon = start_daemon().await;
    let agent = IpcAgent::new(&daemon.socket);
    let client = SessionClient::new(Arc::new(agent), ClientConfig::default());
    let conn = client.create_connection(None).await.unwrap();

    daemon.stop.take().unwrap().send(()).unwrap();
    (&mut daemon.task).await.unwrap().unwrap();

    let err = conn.status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AgentUnreachable);
    assert!(!daemon.socket.exists());
}

#[tokio::test]
async fn malformed_frames_get_an_error_response() {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;
    use warden_agent::ipc::Response;

    let daemon = start_daemon().await;
    let stream = UnixStream::connect(&daemon.socket).await.unwrap();
    let (reader, mut writer) = stream.into_split();

    writer.write_all(b"{\"op\":\"fly\"}\n").await.unwrap();
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await.unwrap();

    let response: Response = serde_json::from_str(&line).unwrap();
    assert!(matches!(response, Response::Error(_)));
}
