//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use warden_core::{Error, ErrorKind};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a hint on stderr.
pub fn hint(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Title and explanation shown for each kind of agent error.
pub fn describe(error: &Error) -> (&'static str, String) {
    match error.kind() {
        ErrorKind::InvalidServer => (
            "Failed to set server",
            "The server you entered is invalid, please try again.".to_string(),
        ),
        ErrorKind::BadPassword => (
            "Bad Password",
            "The username or password you entered is incorrect.".to_string(),
        ),
        ErrorKind::BadTotp => (
            "TOTP Invalid",
            "The TOTP code you entered is invalid.".to_string(),
        ),
        ErrorKind::CaptchaRequired => (
            "Unusual traffic error",
            "Traffic is unusual, please set up api client id and client secret.".to_string(),
        ),
        ErrorKind::RateLimited => {
            let secs = error.retry_after().map_or(0, |d| d.as_secs().max(1));
            (
                "Too many attempts",
                format!("Please wait {secs} seconds before trying again."),
            )
        }
        ErrorKind::AgentUnreachable => (
            "Agent unreachable",
            "Could not reach the warden agent. Is `warden daemonize` running?".to_string(),
        ),
        ErrorKind::InvalidState => ("Not available", error.to_string()),
    }
}

/// Print a failed command's error.
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(agent_error) => {
            let (title, body) = describe(agent_error);
            error(title);
            eprintln!("  {}", body);
            tracing::debug!(error = %agent_error, "Command failed");
        }
        None => error(&format!("{:#}", err)),
    }
}
