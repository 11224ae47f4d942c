//! Local account management.
//!
//! Writes directly to a file-backed account store; no agent is involved.
//! Remote servers are not supported.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use warden_core::{Password, ServerUrl};
use warden_file::{FileIdentity, FileStore};

use crate::{output, prompt};

#[derive(Args, Debug)]
pub struct CreateAccountArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Store URL (must be file://, e.g. file:///home/me/.warden/accounts)
    #[arg(long)]
    pub server: String,

    /// Hex-encoded TOTP seed; the account then requires a second factor
    #[arg(long)]
    pub totp_secret: Option<String>,

    /// Read the password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,

    /// Make the store demand API client credentials on every login
    #[arg(long)]
    pub require_client_credentials: bool,
}

#[derive(Args, Debug)]
pub struct RemoveAccountArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Store URL (must be file://)
    #[arg(long)]
    pub server: String,
}

/// Resolve a `file://` store URL to its directory.
fn local_store(server: &str) -> Result<(ServerUrl, PathBuf)> {
    let server = ServerUrl::new(server).context("Invalid server URL")?;

    if !server.is_local() {
        bail!(
            "Remote account management is not supported by this CLI.\n\
             Use the server's web vault instead.\n\
             For local development, use a file:// URL (e.g., file:///tmp/accounts)"
        );
    }

    let path = server
        .to_file_path()
        .context("file:// URL must name an absolute local path")?;
    Ok((server, path))
}

pub async fn create(args: CreateAccountArgs) -> Result<()> {
    let (server, path) = local_store(&args.server)?;

    let seed = args
        .totp_secret
        .as_deref()
        .map(hex::decode)
        .transpose()
        .context("TOTP secret must be hex")?;

    let password = Password::new(prompt::secret("Password", args.password_stdin)?);

    let require_client_credentials = args.require_client_credentials;
    let account = tokio::task::spawn_blocking(move || {
        let account =
            FileIdentity::new().create_account(&path, &args.email, &password, seed.as_deref())?;
        if require_client_credentials {
            FileStore::new(&path).set_captcha_required(true)?;
        }
        Ok::<_, warden_core::Error>(account)
    })
    .await?
    .context("Failed to create account")?;

    output::field("Id", &account.id);
    output::field("Email", &account.email);
    output::field("Server", server.as_str());
    output::success("Account created successfully");

    Ok(())
}

pub async fn remove(args: RemoveAccountArgs) -> Result<()> {
    let (_, path) = local_store(&args.server)?;
    let store = FileStore::new(path);

    let account = store
        .find_account_by_email(&args.email)?
        .with_context(|| format!("No account for {}", args.email))?;

    if !store.remove_account(&account.id)? {
        bail!("Account {} disappeared while removing it", account.id);
    }

    output::field("Id", &account.id);
    output::success("Account removed");
    Ok(())
}
