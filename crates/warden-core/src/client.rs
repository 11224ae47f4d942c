//! Session client used by frontends.
//!
//! The client is a stateless pass-through: it holds no configuration or
//! secrets of its own, only a reference to the agent and the timeout that
//! bounds every call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::credentials::{ClientSecret, Password, TotpCode};
use crate::error::{Error, TransportError};
use crate::session::{AgentStatus, LoginOutcome, Session};
use crate::traits::CredentialAgent;
use crate::types::ContextId;
use crate::Result;

/// Entry point for frontends.
///
/// Create one at startup and pass it (or the handles it returns) to
/// whatever needs to talk to the agent.
#[derive(Clone)]
pub struct SessionClient {
    agent: Arc<dyn CredentialAgent>,
    config: ClientConfig,
}

impl SessionClient {
    pub fn new(agent: Arc<dyn CredentialAgent>, config: ClientConfig) -> Self {
        Self { agent, config }
    }

    /// Open a connection handle.
    ///
    /// Does not require a session. With `existing`, the new handle observes
    /// the same context as that handle; otherwise the default context.
    ///
    /// # Errors
    ///
    /// Fails only with a transport error when the agent cannot be reached.
    #[instrument(skip_all)]
    pub async fn create_connection(
        &self,
        existing: Option<&ConnectionHandle>,
    ) -> Result<ConnectionHandle> {
        let context = existing
            .map(|handle| handle.context.clone())
            .unwrap_or_default();
        self.connect(context).await
    }

    /// Open a connection handle bound to a specific context.
    #[instrument(skip(self), fields(%context))]
    pub async fn connect(&self, context: ContextId) -> Result<ConnectionHandle> {
        bounded(self.config.call_timeout, self.agent.ping()).await?;
        debug!("Connection established");

        Ok(ConnectionHandle {
            agent: Arc::clone(&self.agent),
            context,
            timeout: self.config.call_timeout,
        })
    }
}

/// A reference to one context of the agent.
///
/// Handles are cheap to clone. All handles for a context share the agent's
/// single state machine for it.
#[derive(Clone)]
pub struct ConnectionHandle {
    agent: Arc<dyn CredentialAgent>,
    context: ContextId,
    timeout: Duration,
}

impl ConnectionHandle {
    /// Returns the context this handle is bound to.
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    #[instrument(skip(self), fields(context = %self.context))]
    pub async fn set_server(&self, url: &str) -> Result<()> {
        bounded(self.timeout, self.agent.set_server(&self.context, url)).await
    }

    #[instrument(skip(self), fields(context = %self.context))]
    pub async fn set_client_id(&self, client_id: &str) -> Result<()> {
        bounded(
            self.timeout,
            self.agent.set_client_id(&self.context, client_id),
        )
        .await
    }

    #[instrument(skip_all, fields(context = %self.context))]
    pub async fn set_client_secret(&self, secret: ClientSecret) -> Result<()> {
        bounded(
            self.timeout,
            self.agent.set_client_secret(&self.context, secret),
        )
        .await
    }

    /// Submit a login attempt. The password is consumed and wiped when the
    /// call returns.
    #[instrument(skip(self, password, totp), fields(context = %self.context))]
    pub async fn login_with_password(
        &self,
        email: &str,
        password: Password,
        totp: Option<TotpCode>,
    ) -> Result<LoginOutcome> {
        bounded(
            self.timeout,
            self.agent
                .login_with_password(&self.context, email, password, totp),
        )
        .await
    }

    /// Run a login attempt on a background task.
    ///
    /// For callers on a UI thread: the attempt runs to completion inside the
    /// agent even if the returned handle is dropped.
    pub fn spawn_login(
        &self,
        email: impl Into<String>,
        password: Password,
        totp: Option<TotpCode>,
    ) -> JoinHandle<Result<LoginOutcome>> {
        let handle = self.clone();
        let email = email.into();
        tokio::spawn(async move { handle.login_with_password(&email, password, totp).await })
    }

    #[instrument(skip_all, fields(context = %self.context))]
    pub async fn submit_totp(&self, code: TotpCode) -> Result<Session> {
        bounded(self.timeout, self.agent.submit_totp(&self.context, code)).await
    }

    #[instrument(skip(self), fields(context = %self.context))]
    pub async fn lock(&self) -> Result<()> {
        bounded(self.timeout, self.agent.lock(&self.context)).await
    }

    #[instrument(skip_all, fields(context = %self.context))]
    pub async fn unlock(&self, secret: Password) -> Result<Session> {
        bounded(self.timeout, self.agent.unlock(&self.context, secret)).await
    }

    #[instrument(skip(self), fields(context = %self.context))]
    pub async fn logout(&self) -> Result<()> {
        bounded(self.timeout, self.agent.logout(&self.context)).await
    }

    pub async fn status(&self) -> Result<AgentStatus> {
        bounded(self.timeout, self.agent.status(&self.context)).await
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("context", &self.context)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Run an agent call, failing with a transport error if it outlives `timeout`.
async fn bounded<T>(timeout: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?timeout, "Agent call timed out");
            Err(Error::Transport(TransportError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use async_trait::async_trait;

    /// An agent that never answers.
    struct StalledAgent;

    #[async_trait]
    impl CredentialAgent for StalledAgent {
        async fn ping(&self) -> Result<()> {
            std::future::pending().await
        }
        async fn set_server(&self, _: &ContextId, _: &str) -> Result<()> {
            std::future::pending().await
        }
        async fn set_client_id(&self, _: &ContextId, _: &str) -> Result<()> {
            Ok(())
        }
        async fn set_client_secret(&self, _: &ContextId, _: ClientSecret) -> Result<()> {
            Ok(())
        }
        async fn login_with_password(
            &self,
            _: &ContextId,
            _: &str,
            _: Password,
            _: Option<TotpCode>,
        ) -> Result<LoginOutcome> {
            std::future::pending().await
        }
        async fn submit_totp(&self, _: &ContextId, _: TotpCode) -> Result<Session> {
            std::future::pending().await
        }
        async fn lock(&self, _: &ContextId) -> Result<()> {
            Ok(())
        }
        async fn unlock(&self, _: &ContextId, _: Password) -> Result<Session> {
            std::future::pending().await
        }
        async fn logout(&self, _: &ContextId) -> Result<()> {
            Ok(())
        }
        async fn status(&self, _: &ContextId) -> Result<AgentStatus> {
            Ok(AgentStatus::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_connection_times_out_as_unreachable() {
        let client = SessionClient::new(
            Arc::new(StalledAgent),
            ClientConfig::default().with_call_timeout(Duration::from_secs(2)),
        );

        let err = client.create_connection(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgentUnreachable);
        assert!(err.to_string().contains("2000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_login_times_out_as_unreachable() {
        let agent: Arc<dyn CredentialAgent> = Arc::new(StalledAgent);
        let handle = ConnectionHandle {
            agent,
            context: ContextId::default(),
            timeout: Duration::from_secs(1),
        };

        let err = handle
            .login_with_password("a@example.com", Password::new("pw"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgentUnreachable);
    }
}
