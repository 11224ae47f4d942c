//! Login and second-factor commands.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use warden_core::{ClientSecret, ConnectionHandle, LoginOutcome, Password, Session, TotpCode};

use super::AgentTarget;
use crate::{output, prompt};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// TOTP code, if the account uses an authenticator app
    #[arg(long)]
    pub totp: Option<String>,

    /// Read the master password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,

    /// Set the server before logging in
    #[arg(long)]
    pub server: Option<String>,

    /// Set the API client id before logging in
    #[arg(long)]
    pub client_id: Option<String>,

    /// Set the API client secret before logging in
    #[arg(
        long,
        env = "WARDEN_CLIENT_SECRET",
        hide_env_values = true,
        value_parser = parse_client_secret
    )]
    pub client_secret: Option<ClientSecret>,
}

fn parse_client_secret(value: &str) -> Result<ClientSecret, String> {
    Ok(ClientSecret::new(value.trim()))
}

#[derive(Args, Debug)]
pub struct TotpArgs {
    /// The current code from the authenticator app
    pub code: String,
}

pub async fn run(args: LoginArgs, target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;

    if let Some(server) = &args.server {
        conn.set_server(server).await?;
    }

    // Blank values are ignored, as in the login form.
    if let Some(client_id) = args.client_id.as_deref().map(str::trim)
        && !client_id.is_empty()
    {
        conn.set_client_id(client_id).await?;
    }
    if let Some(secret) = args.client_secret
        && !secret.is_empty()
    {
        conn.set_client_secret(secret).await?;
    }

    let password = Password::new(prompt::secret("Master password", args.password_stdin)?);
    let totp = args.totp.as_deref().map(str::trim).map(TotpCode::new);

    eprintln!("{}", "Logging in...".dimmed());

    match conn
        .login_with_password(args.email.trim(), password, totp)
        .await?
    {
        LoginOutcome::Authenticated(session) => {
            print_session("Logged in successfully", &session);
            Ok(())
        }
        LoginOutcome::SecondFactorRequired if args.password_stdin => {
            output::hint("Second factor required. Run 'warden totp <code>' to finish.");
            Ok(())
        }
        LoginOutcome::SecondFactorRequired => {
            let code = prompt::line("TOTP code")?;
            submit(&conn, code).await
        }
    }
}

pub async fn totp(args: TotpArgs, target: &AgentTarget) -> Result<()> {
    let conn = target.connect().await?;
    submit(&conn, args.code).await
}

async fn submit(conn: &ConnectionHandle, code: String) -> Result<()> {
    let session = conn.submit_totp(TotpCode::new(code.trim())).await?;
    print_session("Logged in successfully", &session);
    Ok(())
}

pub(crate) fn print_session(message: &str, session: &Session) {
    output::success(message);
    println!();
    output::field("Session", session.handle.as_str());
    output::field(
        "Since",
        &session
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    );
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    #[test]
    fn client_secret_is_redacted_in_debug() {
        let cli = Cli::try_parse_from([
            "warden",
            "login",
            "--email",
            "alice@example.com",
            "--client-secret",
            " api-secret ",
        ])
        .unwrap();

        let Commands::Login(args) = cli.command else {
            panic!("expected login command");
        };
        assert!(!format!("{args:?}").contains("api-secret"));
        assert_eq!(args.client_secret.unwrap().expose_secret(), "api-secret");
    }
}
