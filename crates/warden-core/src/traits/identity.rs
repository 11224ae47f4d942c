//! Identity backend trait.

use async_trait::async_trait;
use std::fmt;

use crate::config::ServerConfig;
use crate::credentials::{Password, TotpCode};
use crate::tokens::AccessToken;
use crate::Result;

/// A single authentication request sent to a backend.
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a Password,
    pub totp: Option<&'a TotpCode>,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("totp", &self.totp.map(|_| "[REDACTED]"))
            .finish()
    }
}

/// What a backend says about a login request that did not fail.
#[derive(Debug, Clone)]
pub enum BackendOutcome {
    /// Credentials (and second factor, if any) accepted.
    Authenticated { access_token: AccessToken },
    /// Password accepted but a second factor is required.
    SecondFactorRequired { providers: Vec<String> },
}

/// A server the agent authenticates users against.
///
/// Implementations classify their failures into [`crate::Error`] before
/// returning and must not include secrets in error messages.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Authenticate against the server named in `server`.
    async fn authenticate(
        &self,
        server: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> Result<BackendOutcome>;
}
