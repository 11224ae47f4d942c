//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{account, daemonize, login, server, session, status};

/// Credential agent and login frontend.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version = env!("WARDEN_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Agent socket path [default: <data dir>/agent.sock]
    #[arg(long, env = "WARDEN_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Seconds to wait for the agent before giving up
    #[arg(long, env = "WARDEN_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Agent context to operate on
    #[arg(long, env = "WARDEN_CONTEXT", default_value = "default", global = true)]
    pub context: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent in the foreground, listening on the socket
    Daemonize(daemonize::DaemonizeArgs),

    /// Set the identity server URL
    SetServer(server::SetServerArgs),

    /// Set the API client id
    SetClientId(server::SetClientIdArgs),

    /// Set the API client secret
    SetClientSecret(server::SetClientSecretArgs),

    /// Log in with email and master password
    Login(login::LoginArgs),

    /// Answer a pending second-factor challenge
    Totp(login::TotpArgs),

    /// Lock the current session
    Lock,

    /// Unlock a locked session
    Unlock(session::UnlockArgs),

    /// End the session
    Logout,

    /// Show the agent's state for this context
    Status(status::StatusArgs),

    /// Create an account in a local file store (file:// servers only)
    CreateAccount(account::CreateAccountArgs),

    /// Remove an account from a local file store (file:// servers only)
    RemoveAccount(account::RemoveAccountArgs),
}
