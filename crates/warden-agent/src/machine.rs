//! The per-context session state machine.
//!
//! ```text
//! Unauthenticated --login ok-------------------> Authenticated
//! Unauthenticated --login ok, 2FA required-----> AwaitingSecondFactor
//! AwaitingSecondFactor --submit_totp ok--------> Authenticated
//! AwaitingSecondFactor --set_server------------> Unauthenticated
//! Authenticated --lock-------------------------> Locked
//! Locked --unlock ok---------------------------> Authenticated
//! any --logout---------------------------------> Unauthenticated
//! ```
//!
//! Callers serialize access; every method runs to completion against a
//! single `&mut self`, so a state is never observed half-transitioned.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use warden_core::error::{AuthError, ConfigError, Error, PolicyError, TransportError};
use warden_core::{
    AccessToken, AgentConfig, AgentStatus, BackendOutcome, ClientSecret, ErrorKind,
    IdentityBackend, LoginOutcome, LoginRequest, Password, Result, ServerConfig, ServerUrl,
    Session, SessionState, TotpCode,
};

use crate::throttle::Throttle;

/// A password accepted by the server, waiting for its second factor.
struct Challenge {
    email: String,
    password: Password,
    server: ServerConfig,
}

/// What the agent keeps for a completed login.
struct Login {
    // Held for the lifetime of the login; never returned to clients.
    #[allow(dead_code)]
    access_token: AccessToken,
    unlock_hash: String,
}

enum Phase {
    Unauthenticated,
    AwaitingSecondFactor(Challenge),
    Authenticated { session: Session, login: Login },
    Locked(Login),
}

pub(crate) struct SessionMachine {
    config: Arc<AgentConfig>,
    server: ServerConfig,
    phase: Phase,
    captcha_pending: bool,
    password_throttle: Throttle,
    totp_throttle: Throttle,
}

impl SessionMachine {
    pub(crate) fn new(config: Arc<AgentConfig>) -> Self {
        Self {
            password_throttle: Throttle::new(&config),
            totp_throttle: Throttle::new(&config),
            config,
            server: ServerConfig::default(),
            phase: Phase::Unauthenticated,
            captcha_pending: false,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        match self.phase {
            Phase::Unauthenticated => SessionState::Unauthenticated,
            Phase::AwaitingSecondFactor(_) => SessionState::AwaitingSecondFactor,
            Phase::Authenticated { .. } => SessionState::Authenticated,
            Phase::Locked(_) => SessionState::Locked,
        }
    }

    pub(crate) fn status(&self) -> AgentStatus {
        AgentStatus {
            state: self.state(),
            server_url: self.server.server_url.clone(),
            has_client_id: self.server.client_id.is_some(),
            has_client_secret: self.server.client_secret.is_some(),
            captcha_pending: self.captcha_pending,
            session: match &self.phase {
                Phase::Authenticated { session, .. } => Some(session.clone()),
                _ => None,
            },
        }
    }

    /// Validate then commit. An invalid URL changes nothing.
    pub(crate) fn set_server(&mut self, url: &str) -> Result<()> {
        let url = ServerUrl::new(url)?;
        let changed = self.server.server_url.as_ref() != Some(&url);

        match self.phase {
            Phase::AwaitingSecondFactor(_) => {
                info!("Server changed mid-challenge, dropping second-factor challenge");
                self.phase = Phase::Unauthenticated;
            }
            Phase::Authenticated { .. } | Phase::Locked(_) if changed => {
                info!("Server changed, ending session");
                self.phase = Phase::Unauthenticated;
            }
            _ => {}
        }

        if changed {
            self.captcha_pending = false;
        }
        self.server.server_url = Some(url);
        Ok(())
    }

    pub(crate) fn set_client_id(&mut self, client_id: &str) {
        self.server.client_id = Some(client_id.to_string());
        self.captcha_pending = false;
    }

    pub(crate) fn set_client_secret(&mut self, secret: ClientSecret) {
        self.server.client_secret = Some(secret);
        self.captcha_pending = false;
    }

    pub(crate) async fn login(
        &mut self,
        backend: &dyn IdentityBackend,
        email: &str,
        password: Password,
        totp: Option<TotpCode>,
    ) -> Result<LoginOutcome> {
        if let Err(wait) = self.password_throttle.check(Instant::now()) {
            warn!(?wait, "Login attempt throttled");
            return Err(rate_limited(wait));
        }

        // A code sent with the password counts against the TOTP throttle too.
        if totp.is_some()
            && let Err(wait) = self.totp_throttle.check(Instant::now())
        {
            warn!(?wait, "TOTP attempt throttled");
            return Err(rate_limited(wait));
        }

        if self.captcha_pending {
            debug!("Captcha still pending, not contacting server");
            return Err(PolicyError::CaptchaRequired.into());
        }

        if self.server.server_url.is_none() {
            return Err(ConfigError::InvalidServer {
                value: String::new(),
                reason: "no server configured".to_string(),
            }
            .into());
        }

        if matches!(self.phase, Phase::AwaitingSecondFactor(_)) {
            debug!("New login replaces pending challenge");
            self.phase = Phase::Unauthenticated;
        }

        let server = self.server.clone();
        let result = backend
            .authenticate(
                &server,
                &LoginRequest {
                    email,
                    password: &password,
                    totp: totp.as_ref(),
                },
            )
            .await;

        match result {
            Ok(BackendOutcome::Authenticated { access_token }) => {
                let session = self.establish(access_token, &password).await?;
                Ok(LoginOutcome::Authenticated(session))
            }
            Ok(BackendOutcome::SecondFactorRequired { providers }) => {
                info!(?providers, "Second factor required");
                self.password_throttle.reset();
                self.phase = Phase::AwaitingSecondFactor(Challenge {
                    email: email.to_string(),
                    password,
                    server,
                });
                Ok(LoginOutcome::SecondFactorRequired)
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::BadPassword => {
                        self.password_throttle.record_failure(Instant::now());
                    }
                    ErrorKind::BadTotp => {
                        self.password_throttle.reset();
                        self.totp_throttle.record_failure(Instant::now());
                        // An existing session outlives a failed re-login.
                        if matches!(self.phase, Phase::Unauthenticated) {
                            self.phase = Phase::AwaitingSecondFactor(Challenge {
                                email: email.to_string(),
                                password,
                                server,
                            });
                        }
                    }
                    ErrorKind::CaptchaRequired => {
                        self.captcha_pending = true;
                    }
                    _ => {}
                }
                warn!(kind = %err.kind(), "Login failed");
                Err(err)
            }
        }
    }

    pub(crate) async fn submit_totp(
        &mut self,
        backend: &dyn IdentityBackend,
        code: TotpCode,
    ) -> Result<Session> {
        let Phase::AwaitingSecondFactor(challenge) = &self.phase else {
            return Err(AuthError::NoPendingChallenge.into());
        };

        if let Err(wait) = self.totp_throttle.check(Instant::now()) {
            warn!(?wait, "TOTP attempt throttled");
            return Err(rate_limited(wait));
        }

        let result = backend
            .authenticate(
                &challenge.server,
                &LoginRequest {
                    email: &challenge.email,
                    password: &challenge.password,
                    totp: Some(&code),
                },
            )
            .await;

        match result {
            Ok(BackendOutcome::Authenticated { access_token }) => {
                let Phase::AwaitingSecondFactor(challenge) =
                    std::mem::replace(&mut self.phase, Phase::Unauthenticated)
                else {
                    return Err(AuthError::NoPendingChallenge.into());
                };
                self.establish(access_token, &challenge.password).await
            }
            Ok(BackendOutcome::SecondFactorRequired { .. }) => {
                self.totp_throttle.record_failure(Instant::now());
                Err(AuthError::BadTotp.into())
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::BadTotp => self.totp_throttle.record_failure(Instant::now()),
                    ErrorKind::BadPassword => {
                        info!("Password no longer accepted, dropping challenge");
                        self.phase = Phase::Unauthenticated;
                    }
                    ErrorKind::CaptchaRequired => self.captcha_pending = true,
                    _ => {}
                }
                warn!(kind = %err.kind(), "TOTP submission failed");
                Err(err)
            }
        }
    }

    pub(crate) fn lock(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.phase, Phase::Unauthenticated) {
            Phase::Authenticated { session, login } => {
                info!(handle = %session.handle, "Session locked");
                self.phase = Phase::Locked(login);
                Ok(())
            }
            Phase::Locked(login) => {
                self.phase = Phase::Locked(login);
                Ok(())
            }
            other => {
                self.phase = other;
                Err(Error::invalid_state(self.state(), "lock"))
            }
        }
    }

    pub(crate) async fn unlock(&mut self, secret: Password) -> Result<Session> {
        let Phase::Locked(login) = &self.phase else {
            return Err(Error::invalid_state(self.state(), "unlock"));
        };

        if let Err(wait) = self.password_throttle.check(Instant::now()) {
            warn!(?wait, "Unlock attempt throttled");
            return Err(rate_limited(wait));
        }

        let hash = login.unlock_hash.clone();
        let ok = tokio::task::spawn_blocking(move || bcrypt::verify(secret.expose_secret(), &hash))
            .await
            .map_err(backend_failure)?
            .map_err(backend_failure)?;

        if !ok {
            self.password_throttle.record_failure(Instant::now());
            warn!("Unlock failed");
            return Err(AuthError::BadPassword.into());
        }

        let Phase::Locked(login) = std::mem::replace(&mut self.phase, Phase::Unauthenticated) else {
            return Err(Error::invalid_state(self.state(), "unlock"));
        };

        self.password_throttle.reset();
        let session = Session::new();
        info!(handle = %session.handle, "Session unlocked");
        self.phase = Phase::Authenticated {
            session: session.clone(),
            login,
        };
        Ok(session)
    }

    pub(crate) fn logout(&mut self) {
        if !matches!(self.phase, Phase::Unauthenticated) {
            info!("Logged out");
        }
        self.phase = Phase::Unauthenticated;
    }

    /// Commit a successful authentication, replacing any prior session.
    async fn establish(&mut self, access_token: AccessToken, password: &Password) -> Result<Session> {
        let secret = password.clone();
        let cost = self.config.unlock_hash_cost;
        let unlock_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(secret.expose_secret(), cost))
                .await
                .map_err(backend_failure)?
                .map_err(backend_failure)?;

        self.password_throttle.reset();
        self.totp_throttle.reset();

        let session = Session::new();
        info!(handle = %session.handle, "Session established");
        self.phase = Phase::Authenticated {
            session: session.clone(),
            login: Login {
                access_token,
                unlock_hash,
            },
        };
        Ok(session)
    }
}

fn rate_limited(wait: std::time::Duration) -> Error {
    PolicyError::RateLimited {
        retry_after_ms: wait.as_millis().max(1) as u64,
    }
    .into()
}

fn backend_failure(err: impl ToString) -> Error {
    Error::Transport(TransportError::Backend {
        message: err.to_string(),
    })
}
