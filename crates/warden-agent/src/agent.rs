//! In-process credential agent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use warden_core::{
    AgentConfig, AgentStatus, ClientSecret, ContextId, CredentialAgent, Error, IdentityBackend,
    LoginOutcome, Password, Result, Session, TotpCode,
};

use crate::machine::SessionMachine;

/// One user context: its state machine plus the last published snapshot.
struct Context {
    machine: Mutex<SessionMachine>,
    snapshot: RwLock<AgentStatus>,
}

impl Context {
    fn new(config: Arc<AgentConfig>) -> Self {
        Self {
            machine: Mutex::new(SessionMachine::new(config)),
            snapshot: RwLock::new(AgentStatus::default()),
        }
    }

    /// Store a snapshot. Call while holding the machine lock.
    fn publish(&self, machine: &SessionMachine) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = machine.status();
    }

    fn snapshot(&self) -> AgentStatus {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The credential agent, hosted in the current process.
///
/// Owns the server configuration and session state for every context.
/// Operations on one context are serialized. Authentication attempts run
/// on their own task, so a caller that gives up (a timeout, a dropped
/// future) never leaves a context half-transitioned.
pub struct LocalAgent {
    backend: Arc<dyn IdentityBackend>,
    config: Arc<AgentConfig>,
    contexts: RwLock<HashMap<ContextId, Arc<Context>>>,
    shut_down: AtomicBool,
}

impl LocalAgent {
    pub fn new(backend: Arc<dyn IdentityBackend>, config: AgentConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            contexts: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Stop serving. Every session is destroyed and later calls fail as
    /// if the agent were gone.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let contexts: Vec<_> = self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (id, context) in contexts {
            let mut machine = context.machine.lock().await;
            machine.logout();
            context.publish(&machine);
            debug!(context = %id, "Context destroyed");
        }

        info!("Agent shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(Error::agent_unreachable("agent has shut down"))
        } else {
            Ok(())
        }
    }

    fn context(&self, id: &ContextId) -> Result<Arc<Context>> {
        self.ensure_running()?;

        if let Some(context) = self
            .contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(Arc::clone(context));
        }

        let mut contexts = self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let context = contexts.entry(id.clone()).or_insert_with(|| {
            debug!(context = %id, "Context created");
            Arc::new(Context::new(Arc::clone(&self.config)))
        });
        Ok(Arc::clone(context))
    }

    /// Run `op` against a context's machine on a detached task.
    async fn run_detached<T, F>(&self, id: &ContextId, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(
                &'a mut SessionMachine,
                &'a dyn IdentityBackend,
            ) -> BoxFuture<'a, Result<T>>
            + Send
            + 'static,
    {
        let context = self.context(id)?;
        let backend = Arc::clone(&self.backend);

        let task = tokio::spawn(async move {
            let mut machine = context.machine.lock().await;
            let result = op(&mut *machine, backend.as_ref()).await;
            context.publish(&machine);
            result
        });

        task.await
            .map_err(|e| Error::agent_unreachable(format!("agent task failed: {e}")))?
    }
}

#[async_trait]
impl CredentialAgent for LocalAgent {
    async fn ping(&self) -> Result<()> {
        self.ensure_running()
    }

    #[instrument(skip(self), fields(%context))]
    async fn set_server(&self, context: &ContextId, url: &str) -> Result<()> {
        let ctx = self.context(context)?;
        let mut machine = ctx.machine.lock().await;
        let result = machine.set_server(url);
        ctx.publish(&machine);
        result
    }

    #[instrument(skip(self), fields(%context))]
    async fn set_client_id(&self, context: &ContextId, client_id: &str) -> Result<()> {
        let ctx = self.context(context)?;
        let mut machine = ctx.machine.lock().await;
        machine.set_client_id(client_id);
        ctx.publish(&machine);
        Ok(())
    }

    #[instrument(skip(self, secret), fields(%context))]
    async fn set_client_secret(&self, context: &ContextId, secret: ClientSecret) -> Result<()> {
        let ctx = self.context(context)?;
        let mut machine = ctx.machine.lock().await;
        machine.set_client_secret(secret);
        ctx.publish(&machine);
        Ok(())
    }

    #[instrument(skip(self, password, totp), fields(%context))]
    async fn login_with_password(
        &self,
        context: &ContextId,
        email: &str,
        password: Password,
        totp: Option<TotpCode>,
    ) -> Result<LoginOutcome> {
        let email = email.to_string();
        self.run_detached(context, move |machine, backend| {
            Box::pin(async move { machine.login(backend, &email, password, totp).await })
        })
        .await
    }

    #[instrument(skip(self, code), fields(%context))]
    async fn submit_totp(&self, context: &ContextId, code: TotpCode) -> Result<Session> {
        self.run_detached(context, move |machine, backend| {
            Box::pin(async move { machine.submit_totp(backend, code).await })
        })
        .await
    }

    #[instrument(skip(self), fields(%context))]
    async fn lock(&self, context: &ContextId) -> Result<()> {
        let ctx = self.context(context)?;
        let mut machine = ctx.machine.lock().await;
        let result = machine.lock();
        ctx.publish(&machine);
        result
    }

    #[instrument(skip(self, secret), fields(%context))]
    async fn unlock(&self, context: &ContextId, secret: Password) -> Result<Session> {
        self.run_detached(context, move |machine, _| {
            Box::pin(async move { machine.unlock(secret).await })
        })
        .await
    }

    #[instrument(skip(self), fields(%context))]
    async fn logout(&self, context: &ContextId) -> Result<()> {
        let ctx = self.context(context)?;
        let mut machine = ctx.machine.lock().await;
        machine.logout();
        ctx.publish(&machine);
        Ok(())
    }

    async fn status(&self, context: &ContextId) -> Result<AgentStatus> {
        // Reads the published snapshot, never waiting behind a login.
        Ok(self.context(context)?.snapshot())
    }
}

impl std::fmt::Debug for LocalAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contexts = self
            .contexts
            .read()
            .map(|c| c.len())
            .unwrap_or_default();
        f.debug_struct("LocalAgent")
            .field("config", &self.config)
            .field("contexts", &contexts)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
