//! Subcommand implementations.

pub mod account;
pub mod daemonize;
pub mod login;
pub mod server;
pub mod session;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use warden_agent::ipc::IpcAgent;
use warden_core::{ClientConfig, ConnectionHandle, ContextId, SessionClient};

use crate::cli::{Cli, Commands};
use crate::config;

/// Where and how to reach the agent, from the global flags.
#[derive(Debug, Clone)]
pub struct AgentTarget {
    pub socket: PathBuf,
    pub timeout: Duration,
    pub context: ContextId,
}

impl AgentTarget {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let socket = match &cli.socket {
            Some(path) => path.clone(),
            None => config::default_socket_path()?,
        };

        Ok(Self {
            socket,
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            context: ContextId::new(cli.context.as_str()),
        })
    }

    /// Open a connection handle to the running agent.
    pub async fn connect(&self) -> Result<ConnectionHandle> {
        let client = SessionClient::new(
            Arc::new(IpcAgent::new(&self.socket)),
            ClientConfig::default().with_call_timeout(self.timeout),
        );
        Ok(client.connect(self.context.clone()).await?)
    }
}

pub async fn handle(cli: Cli) -> Result<()> {
    let target = AgentTarget::from_cli(&cli)?;

    match cli.command {
        Commands::Daemonize(args) => daemonize::run(args, &target).await,
        Commands::SetServer(args) => server::set_server(args, &target).await,
        Commands::SetClientId(args) => server::set_client_id(args, &target).await,
        Commands::SetClientSecret(args) => server::set_client_secret(args, &target).await,
        Commands::Login(args) => login::run(args, &target).await,
        Commands::Totp(args) => login::totp(args, &target).await,
        Commands::Lock => session::lock(&target).await,
        Commands::Unlock(args) => session::unlock(args, &target).await,
        Commands::Logout => session::logout(&target).await,
        Commands::Status(args) => status::run(args, &target).await,
        Commands::CreateAccount(args) => account::create(args).await,
        Commands::RemoveAccount(args) => account::remove(args).await,
    }
}
