//! CLI integration tests against a daemon and a file-backed account store.

#![cfg(unix)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;
use url::Url;

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "correct horse";
const SEED_HEX: &str = "3132333435363738393031323334353637383930";

/// A temp home, account store and socket for one test.
struct Env {
    dir: TempDir,
    socket: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("agent.sock");
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        Self { dir, socket }
    }

    fn store_url(&self) -> String {
        Url::from_directory_path(self.dir.path().join("accounts"))
            .expect("Failed to convert path to file URL")
            .to_string()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_warden"));
        cmd.arg("--socket").arg(&self.socket);
        cmd.args(args);
        cmd.env("HOME", self.dir.path().join("home"));
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("home/config"));
        cmd.env("XDG_DATA_HOME", self.dir.path().join("home/data"));
        cmd.env_remove("WARDEN_SOCKET");
        cmd.env_remove("WARDEN_CONTEXT");
        cmd.env_remove("WARDEN_CLIENT_SECRET");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .stdin(Stdio::null())
            .output()
            .expect("Failed to execute CLI")
    }

    /// Run with `input` written to stdin.
    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to execute CLI");
        child
            .stdin
            .take()
            .unwrap()
            .write_all(format!("{input}\n").as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }

    fn create_account(&self, extra: &[&str]) {
        let url = self.store_url();
        let mut args = vec![
            "create-account",
            "--server",
            &url,
            "--email",
            EMAIL,
            "--password-stdin",
        ];
        args.extend_from_slice(extra);
        let output = self.run_with_stdin(&args, PASSWORD);
        assert_success(&output, "create-account");
    }

    fn start_daemon(&self) -> Daemon {
        let child = self
            .command(&["daemonize"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start daemon");

        wait_for(&self.socket);
        Daemon(child)
    }
}

/// Kills the daemon when dropped.
struct Daemon(Child);

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn wait_for(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "daemon never bound its socket");
        sleep(Duration::from_millis(50));
    }
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn state(env: &Env) -> String {
    let output = env.run(&["status", "--json"]);
    assert_success(&output, "status");
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    status["state"].as_str().unwrap().to_string()
}

#[test]
fn test_commands_fail_without_daemon() {
    let env = Env::new();

    let output = env.run(&["status"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Agent unreachable"));
}

#[test]
fn test_create_account_rejects_remote_server() {
    let env = Env::new();

    let output = env.run(&[
        "create-account",
        "--server",
        "https://vault.example.com",
        "--email",
        EMAIL,
        "--password-stdin",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not supported"));
}

#[test]
fn test_invalid_server_is_reported() {
    let env = Env::new();
    let _daemon = env.start_daemon();

    let output = env.run(&["set-server", "http://vault.example.com"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to set server"));
}

#[test]
fn test_login_lock_unlock_logout() {
    let env = Env::new();
    env.create_account(&[]);
    let _daemon = env.start_daemon();

    let output = env.run(&["set-server", &env.store_url()]);
    assert_success(&output, "set-server");

    let output = env.run_with_stdin(&["login", "--email", EMAIL, "--password-stdin"], "wrong");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Bad Password"));
    assert_eq!(state(&env), "unauthenticated");

    let output = env.run_with_stdin(&["login", "--email", EMAIL, "--password-stdin"], PASSWORD);
    assert_success(&output, "login");
    assert!(stdout(&output).contains("Logged in successfully"));
    assert_eq!(state(&env), "authenticated");

    assert_success(&env.run(&["lock"]), "lock");
    assert_eq!(state(&env), "locked");

    let output = env.run_with_stdin(&["unlock", "--password-stdin"], PASSWORD);
    assert_success(&output, "unlock");
    assert_eq!(state(&env), "authenticated");

    assert_success(&env.run(&["logout"]), "logout");
    assert_eq!(state(&env), "unauthenticated");
}

#[test]
fn test_login_with_second_factor() {
    let env = Env::new();
    env.create_account(&["--totp-secret", SEED_HEX]);
    let _daemon = env.start_daemon();

    let url = env.store_url();
    let output = env.run_with_stdin(
        &[
            "login",
            "--server",
            &url,
            "--email",
            EMAIL,
            "--password-stdin",
        ],
        PASSWORD,
    );
    assert_success(&output, "login");
    assert!(stderr(&output).contains("Second factor required"));
    assert_eq!(state(&env), "awaiting_second_factor");

    let output = env.run(&["totp", "000000"]);
    if !output.status.success() {
        assert!(stderr(&output).contains("TOTP Invalid"));
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let seed = hex::decode(SEED_HEX).unwrap();
    let code = warden_file::totp::generate(&seed, now).unwrap();

    let output = env.run(&["totp", &code]);
    assert_success(&output, "totp");
    assert_eq!(state(&env), "authenticated");
}

#[test]
fn test_captcha_requires_client_credentials() {
    let env = Env::new();
    env.create_account(&["--require-client-credentials"]);
    let _daemon = env.start_daemon();

    let url = env.store_url();
    let output = env.run_with_stdin(
        &[
            "login",
            "--server",
            &url,
            "--email",
            EMAIL,
            "--password-stdin",
        ],
        PASSWORD,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unusual traffic error"));

    let output = env
        .command(&[
            "login",
            "--email",
            EMAIL,
            "--password-stdin",
            "--client-id",
            "user.1234",
        ])
        .env("WARDEN_CLIENT_SECRET", "api-secret")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            child
                .stdin
                .take()
                .unwrap()
                .write_all(format!("{PASSWORD}\n").as_bytes())?;
            child.wait_with_output()
        })
        .unwrap();
    assert_success(&output, "login with client credentials");
    assert_eq!(state(&env), "authenticated");
}

#[test]
fn test_contexts_are_separate() {
    let env = Env::new();
    env.create_account(&[]);
    let _daemon = env.start_daemon();

    let url = env.store_url();
    let output = env.run_with_stdin(
        &[
            "--context",
            "work",
            "login",
            "--server",
            &url,
            "--email",
            EMAIL,
            "--password-stdin",
        ],
        PASSWORD,
    );
    assert_success(&output, "login");

    assert_eq!(state(&env), "unauthenticated");

    let output = env.run(&["--context", "work", "status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["state"], "authenticated");
}

#[test]
fn test_removed_account_cannot_log_in() {
    let env = Env::new();
    env.create_account(&[]);

    let url = env.store_url();
    let output = env.run(&["remove-account", "--server", &url, "--email", EMAIL]);
    assert_success(&output, "remove-account");
    assert!(stdout(&output).contains("Account removed"));

    let _daemon = env.start_daemon();
    let output = env.run_with_stdin(
        &[
            "login",
            "--server",
            &url,
            "--email",
            EMAIL,
            "--password-stdin",
        ],
        PASSWORD,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Bad Password"));
}
