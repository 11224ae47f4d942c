//! File-backed identity backend.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use tracing::{debug, instrument};
use uuid::Uuid;

use warden_core::error::{AuthError, ConfigError, Error, PolicyError, TransportError};
use warden_core::{
    AccessToken, BackendOutcome, IdentityBackend, LoginRequest, Password, Result, ServerConfig,
};

use crate::store::{FileStore, LocalAccount};
use crate::totp;

/// Provider name reported when an account has a TOTP seed.
const AUTHENTICATOR: &str = "authenticator";

/// Identity backend that authenticates against a local [`FileStore`].
///
/// The store location is taken from the `file://` server URL of each
/// attempt's configuration snapshot.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    cost: u32,
}

impl Default for FileIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl FileIdentity {
    pub fn new() -> Self {
        Self { cost: DEFAULT_COST }
    }

    /// Use a different bcrypt cost for new accounts.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Create an account in the store at `root`.
    #[instrument(skip(self, root, password, totp_secret))]
    pub fn create_account(
        &self,
        root: impl AsRef<Path>,
        email: &str,
        password: &Password,
        totp_secret: Option<&[u8]>,
    ) -> Result<LocalAccount> {
        if password.is_empty() {
            return Err(AuthError::BadPassword.into());
        }

        let password_hash = hash(password.expose_secret(), self.cost).map_err(backend)?;
        FileStore::new(root).create_account(email, &password_hash, totp_secret.map(hex::encode))
    }

    fn store_for(server: &ServerConfig) -> Result<FileStore> {
        let url = server.server_url.as_ref().ok_or_else(|| ConfigError::InvalidServer {
            value: String::new(),
            reason: "no server configured".to_string(),
        })?;

        let path = url.to_file_path().ok_or_else(|| ConfigError::InvalidServer {
            value: url.to_string(),
            reason: "not a file:// URL".to_string(),
        })?;

        Ok(FileStore::new(path))
    }
}

#[async_trait]
impl IdentityBackend for FileIdentity {
    #[instrument(skip(self, server, request), fields(email = %request.email))]
    async fn authenticate(
        &self,
        server: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> Result<BackendOutcome> {
        let store = Self::store_for(server)?;

        if store.captcha_required() && (server.client_id.is_none() || server.client_secret.is_none())
        {
            debug!("Store demands API client credentials");
            return Err(PolicyError::CaptchaRequired.into());
        }

        let account = store
            .find_account_by_email(request.email)?
            .ok_or(AuthError::BadPassword)?;

        let password = request.password.clone();
        let password_hash = account.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || {
            verify(password.expose_secret(), &password_hash)
        })
        .await
        .map_err(|e| backend(e.to_string()))?
        .map_err(backend)?;

        if !ok {
            return Err(AuthError::BadPassword.into());
        }

        if let Some(seed) = &account.totp_secret {
            let Some(code) = request.totp else {
                debug!("Second factor required");
                return Ok(BackendOutcome::SecondFactorRequired {
                    providers: vec![AUTHENTICATOR.to_string()],
                });
            };

            let seed = hex::decode(seed).map_err(backend)?;
            if !totp::verify(&seed, code.expose_secret(), unix_now()) {
                return Err(AuthError::BadTotp.into());
            }
        }

        debug!(id = %account.id, "Authenticated local account");

        Ok(BackendOutcome::Authenticated {
            access_token: AccessToken::new(format!("{}.{}", account.id, Uuid::new_v4().simple())),
        })
    }
}

fn backend(err: impl ToString) -> Error {
    Error::Transport(TransportError::Backend {
        message: err.to_string(),
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warden_core::{ClientSecret, ErrorKind, ServerUrl, TotpCode};

    const SEED: &[u8] = b"12345678901234567890";

    fn server_for(dir: &TempDir) -> ServerConfig {
        let url = format!("file://{}", dir.path().display());
        ServerConfig {
            server_url: Some(ServerUrl::new(url).unwrap()),
            ..Default::default()
        }
    }

    fn identity() -> FileIdentity {
        FileIdentity::new().with_cost(4)
    }

    #[tokio::test]
    async fn login_succeeds_with_right_password() {
        let dir = TempDir::new().unwrap();
        identity()
            .create_account(dir.path(), "alice@example.com", &Password::new("pw"), None)
            .unwrap();

        let password = Password::new("pw");
        let request = LoginRequest {
            email: "alice@example.com",
            password: &password,
            totp: None,
        };
        let outcome = identity()
            .authenticate(&server_for(&dir), &request)
            .await
            .unwrap();
        assert!(matches!(outcome, BackendOutcome::Authenticated { .. }));
    }

    #[tokio::test]
    async fn unknown_email_looks_like_bad_password() {
        let dir = TempDir::new().unwrap();
        let password = Password::new("pw");
        let request = LoginRequest {
            email: "nobody@example.com",
            password: &password,
            totp: None,
        };
        let err = identity()
            .authenticate(&server_for(&dir), &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadPassword);
    }

    #[tokio::test]
    async fn totp_account_requires_and_checks_code() {
        let dir = TempDir::new().unwrap();
        identity()
            .create_account(dir.path(), "t@example.com", &Password::new("pw"), Some(SEED))
            .unwrap();
        let password = Password::new("pw");

        let request = LoginRequest {
            email: "t@example.com",
            password: &password,
            totp: None,
        };
        let outcome = identity()
            .authenticate(&server_for(&dir), &request)
            .await
            .unwrap();
        assert!(matches!(outcome, BackendOutcome::SecondFactorRequired { .. }));

        let good = TotpCode::new(totp::generate(SEED, unix_now()).unwrap());
        let request = LoginRequest {
            totp: Some(&good),
            ..request
        };
        let outcome = identity()
            .authenticate(&server_for(&dir), &request)
            .await
            .unwrap();
        assert!(matches!(outcome, BackendOutcome::Authenticated { .. }));

        let bad = TotpCode::new("abcdef");
        let request = LoginRequest {
            totp: Some(&bad),
            ..request
        };
        let err = identity()
            .authenticate(&server_for(&dir), &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadTotp);
    }

    #[tokio::test]
    async fn captcha_marker_requires_client_credentials() {
        let dir = TempDir::new().unwrap();
        identity()
            .create_account(dir.path(), "c@example.com", &Password::new("pw"), None)
            .unwrap();
        FileStore::new(dir.path()).set_captcha_required(true).unwrap();

        let password = Password::new("pw");
        let request = LoginRequest {
            email: "c@example.com",
            password: &password,
            totp: None,
        };

        let mut server = server_for(&dir);
        let err = identity().authenticate(&server, &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaptchaRequired);

        server.client_id = Some("user.client".into());
        server.client_secret = Some(ClientSecret::new("secret"));
        assert!(identity().authenticate(&server, &request).await.is_ok());
    }

    #[tokio::test]
    async fn network_url_is_rejected() {
        let password = Password::new("pw");
        let request = LoginRequest {
            email: "a@example.com",
            password: &password,
            totp: None,
        };
        let server = ServerConfig {
            server_url: Some(ServerUrl::new("https://vault.example.com").unwrap()),
            ..Default::default()
        };
        let err = identity().authenticate(&server, &request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidServer);
    }
}
