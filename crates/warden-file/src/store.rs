//! Filesystem storage for local accounts.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use warden_core::Result;
use warden_core::error::{Error, TransportError};

fn map_io(err: std::io::Error) -> Error {
    Error::Transport(TransportError::Backend {
        message: format!("IO error: {}", err),
    })
}

fn map_json(err: serde_json::Error) -> Error {
    Error::Transport(TransportError::Backend {
        message: format!("corrupt account store: {}", err),
    })
}

/// Account metadata stored in the local account store.
#[derive(Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    /// Store-assigned account id.
    pub id: String,
    /// Login email, compared case-insensitively.
    pub email: String,
    /// When the account was created (RFC 3339).
    pub created_at: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
    /// Hex-encoded TOTP seed, when the account has a second factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
}

impl std::fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("totp", &self.totp_secret.is_some())
            .finish()
    }
}

/// Filesystem-backed account store.
///
/// Layout below the root:
///
/// ```text
/// accounts/<id>/account.json
/// accounts.lock
/// captcha            (present => logins need API client credentials)
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }

    fn account_path(&self, id: &str) -> PathBuf {
        self.accounts_dir().join(id).join("account.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("accounts.lock")
    }

    fn captcha_path(&self) -> PathBuf {
        self.root.join("captcha")
    }

    /// Create an account. Emails are unique (case-insensitive).
    #[instrument(skip(self, password_hash, totp_secret))]
    pub fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        totp_secret: Option<String>,
    ) -> Result<LocalAccount> {
        fs::create_dir_all(&self.root).map_err(map_io)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(map_io)?;

        lock_file.lock_exclusive().map_err(map_io)?;

        if self.find_account_by_email(email)?.is_some() {
            lock_file.unlock().map_err(map_io)?;
            return Err(Error::Transport(TransportError::Backend {
                message: format!("account {} already exists", email),
            }));
        }

        let account = LocalAccount {
            id: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            created_at: Utc::now().to_rfc3339(),
            password_hash: password_hash.to_string(),
            totp_secret,
        };

        let account_path = self.account_path(&account.id);
        if let Some(parent) = account_path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let content = serde_json::to_string_pretty(&account).map_err(map_json)?;
        fs::write(&account_path, content).map_err(map_io)?;

        lock_file.unlock().map_err(map_io)?;

        debug!(id = %account.id, "Created local account");

        Ok(account)
    }

    pub fn get_account(&self, id: &str) -> Result<Option<LocalAccount>> {
        let account_path = self.account_path(id);

        if !account_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&account_path).map_err(map_io)?;
        let account = serde_json::from_str(&content).map_err(map_json)?;

        Ok(Some(account))
    }

    pub fn list_accounts(&self) -> Result<Vec<LocalAccount>> {
        let accounts_dir = self.accounts_dir();

        if !accounts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut accounts = Vec::new();

        for entry in fs::read_dir(&accounts_dir).map_err(map_io)? {
            let entry = entry.map_err(map_io)?;
            let account_file = entry.path().join("account.json");

            if account_file.exists() {
                let content = fs::read_to_string(&account_file).map_err(map_io)?;
                if let Ok(account) = serde_json::from_str::<LocalAccount>(&content) {
                    accounts.push(account);
                }
            }
        }

        Ok(accounts)
    }

    pub fn find_account_by_email(&self, email: &str) -> Result<Option<LocalAccount>> {
        let accounts = self.list_accounts()?;
        Ok(accounts
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim())))
    }

    #[instrument(skip(self))]
    pub fn remove_account(&self, id: &str) -> Result<bool> {
        let account_dir = self.accounts_dir().join(id);

        if !account_dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&account_dir).map_err(map_io)?;
        debug!("Removed local account");

        Ok(true)
    }

    /// Whether logins must carry API client credentials.
    pub fn captcha_required(&self) -> bool {
        self.captcha_path().exists()
    }

    /// Turn the captcha requirement on or off.
    pub fn set_captcha_required(&self, required: bool) -> Result<()> {
        let path = self.captcha_path();
        if required {
            fs::create_dir_all(&self.root).map_err(map_io)?;
            fs::write(&path, b"").map_err(map_io)?;
        } else if path.exists() {
            fs::remove_file(&path).map_err(map_io)?;
        }
        Ok(())
    }
}
