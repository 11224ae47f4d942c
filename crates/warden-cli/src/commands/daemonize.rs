//! Daemonize command implementation.
//!
//! Hosts a [`LocalAgent`] on the agent socket until interrupted. Sessions
//! live only in this process and are destroyed when it exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use warden_agent::LocalAgent;
use warden_agent::ipc::IpcServer;
use warden_file::FileIdentity;
use warden_http::{HttpIdentity, HttpIdentityConfig};

use super::AgentTarget;
use crate::backend::RoutedIdentity;
use crate::config::DaemonConfig;
use crate::output;

#[derive(Args, Debug)]
pub struct DaemonizeArgs {
    /// JSON config file [default: <config dir>/config.json if present]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: DaemonizeArgs, target: &AgentTarget) -> Result<()> {
    let config = DaemonConfig::discover(args.config.as_deref())?;

    let mut http_config = HttpIdentityConfig::default();
    if let Some(secs) = config.http_timeout_secs {
        http_config.request_timeout = Duration::from_secs(secs);
    }
    let http = HttpIdentity::new(http_config).context("Failed to create HTTP backend")?;
    let backend = RoutedIdentity::new(FileIdentity::new(), http);

    let agent = Arc::new(LocalAgent::new(Arc::new(backend), config.agent));

    let server = IpcServer::bind(&target.socket).with_context(|| {
        format!("Failed to bind agent socket {}", target.socket.display())
    })?;

    output::success("Agent started");
    output::field("Socket", &server.path().display().to_string());

    server
        .serve(agent.clone(), shutdown_signal())
        .await
        .context("Agent socket failed")?;

    agent.shutdown().await;
    info!("Sessions destroyed, exiting");

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
