//! Lock, unlock and logout commands.

use anyhow::Result;
use clap::Args;

use warden_core::Password;

use super::AgentTarget;
use super::login::print_session;
use crate::{output, prompt};

#[derive(Args, Debug)]
pub struct UnlockArgs {
    /// Read the master password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

pub async fn lock(target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    conn.lock().await?;

    output::success("Session locked");
    Ok(())
}

pub async fn unlock(args: UnlockArgs, target: &AgentTarget) -> Result<()> {
    let secret = Password::new(prompt::secret("Master password", args.password_stdin)?);

    let conn = target.connect().await?;
    let session = conn.unlock(secret).await?;

    print_session("Session unlocked", &session);
    Ok(())
}

pub async fn logout(target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    conn.logout().await?;

    output::success("Logged out");
    Ok(())
}
