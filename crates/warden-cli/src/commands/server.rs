//! Server configuration commands.

use anyhow::Result;
use clap::Args;

use warden_core::ClientSecret;

use super::AgentTarget;
use crate::{output, prompt};

#[derive(Args, Debug)]
pub struct SetServerArgs {
    /// Server URL (https://, http://localhost, or file:// for a local store)
    pub url: String,
}

#[derive(Args, Debug)]
pub struct SetClientIdArgs {
    /// API client id (e.g. user.xxxxxxxx)
    pub client_id: String,
}

#[derive(Args, Debug)]
pub struct SetClientSecretArgs {
    /// Read the secret from stdin instead of prompting
    #[arg(long)]
    pub stdin: bool,
}

pub async fn set_server(args: SetServerArgs, target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    conn.set_server(&args.url).await?;

    output::success("Server set");
    Ok(())
}

pub async fn set_client_id(args: SetClientIdArgs, target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    conn.set_client_id(args.client_id.trim()).await?;

    output::success("Client id set");
    Ok(())
}

pub async fn set_client_secret(args: SetClientSecretArgs, target: &AgentTarget) -> Result<()> {
    let secret = ClientSecret::new(prompt::secret("Client secret", args.stdin)?.trim());

    let conn = target.connect().await?;
    conn.set_client_secret(secret).await?;

    output::success("Client secret set");
    Ok(())
}
