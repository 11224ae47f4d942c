//! Reading secrets from the terminal or stdin.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};

/// Read a secret without echo, or one line of stdin with `from_stdin`.
pub fn secret(label: &str, from_stdin: bool) -> Result<String> {
    let value = if from_stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read secret from stdin")?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password(format!("{label}: ")).context("Failed to read secret")?
    };

    if value.is_empty() {
        bail!("{label} must not be empty");
    }
    Ok(value)
}

/// Ask for a visible line of input, such as a TOTP code.
pub fn line(label: &str) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
