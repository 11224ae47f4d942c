//! Credential agent trait.

use async_trait::async_trait;

use crate::credentials::{ClientSecret, Password, TotpCode};
use crate::session::{AgentStatus, LoginOutcome, Session};
use crate::types::ContextId;
use crate::Result;

/// The operations a credential agent exposes to frontends.
///
/// Implementations are transport-independent: an in-process agent and a
/// socket client both implement this trait. Every mutating operation on a
/// context is serialized against the others on that context.
#[async_trait]
pub trait CredentialAgent: Send + Sync {
    /// Check that the agent is reachable.
    async fn ping(&self) -> Result<()>;

    /// Validate and commit a new server URL.
    async fn set_server(&self, context: &ContextId, url: &str) -> Result<()>;

    /// Overwrite the API client id.
    async fn set_client_id(&self, context: &ContextId, client_id: &str) -> Result<()>;

    /// Overwrite the API client secret.
    async fn set_client_secret(&self, context: &ContextId, secret: ClientSecret) -> Result<()>;

    /// Submit a login attempt against the current server configuration.
    async fn login_with_password(
        &self,
        context: &ContextId,
        email: &str,
        password: Password,
        totp: Option<TotpCode>,
    ) -> Result<LoginOutcome>;

    /// Answer a pending second-factor challenge.
    async fn submit_totp(&self, context: &ContextId, code: TotpCode) -> Result<Session>;

    /// Lock an authenticated session.
    async fn lock(&self, context: &ContextId) -> Result<()>;

    /// Unlock a locked session with the local secret.
    async fn unlock(&self, context: &ContextId, secret: Password) -> Result<Session>;

    /// Drop any session or pending challenge.
    async fn logout(&self, context: &ContextId) -> Result<()>;

    /// Read a consistent snapshot of the context.
    async fn status(&self, context: &ContextId) -> Result<AgentStatus>;
}
