//! Status command implementation.

use anyhow::Result;
use clap::Args;

use super::AgentTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the raw status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs, target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    let status = conn.status().await?;

    if args.json {
        return output::json_pretty(&status);
    }

    output::field("Context", conn.context().as_str());
    output::field("State", &status.state.to_string());
    output::field(
        "Server",
        status
            .server_url
            .as_ref()
            .map_or("(not set)", |url| url.as_str()),
    );
    output::field("Client id", if status.has_client_id { "set" } else { "not set" });
    output::field(
        "Client secret",
        if status.has_client_secret { "set" } else { "not set" },
    );
    if status.captcha_pending {
        output::hint("The server requires an API client id and secret before the next login.");
    }
    if let Some(session) = &status.session {
        output::field("Session", session.handle.as_str());
    }

    Ok(())
}
