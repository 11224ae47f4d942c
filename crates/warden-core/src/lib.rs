//! warden-core - Core types and traits for the warden credential agent.
//!
//! Frontends never talk to an identity server directly. They open a
//! [`ConnectionHandle`] through a [`SessionClient`] and drive a
//! [`CredentialAgent`], which owns the server configuration and the
//! session state machine.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_core::{ClientConfig, CredentialAgent, LoginOutcome, Password, SessionClient};
//!
//! # async fn example(agent: Arc<dyn CredentialAgent>) -> Result<(), warden_core::Error> {
//! let client = SessionClient::new(agent, ClientConfig::default());
//! let conn = client.create_connection(None).await?;
//!
//! conn.set_server("https://vault.example.com").await?;
//! match conn
//!     .login_with_password("alice@example.com", Password::new("hunter2"), None)
//!     .await?
//! {
//!     LoginOutcome::Authenticated(session) => println!("session {}", session.handle),
//!     LoginOutcome::SecondFactorRequired => println!("enter your TOTP code"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use client::{ConnectionHandle, SessionClient};
pub use config::{AgentConfig, ClientConfig, ServerConfig};
pub use credentials::{ClientSecret, Password, TotpCode, redact};
pub use error::{Error, ErrorKind};
pub use session::{AgentStatus, LoginOutcome, Session, SessionState};
pub use tokens::AccessToken;
pub use traits::{BackendOutcome, CredentialAgent, IdentityBackend, LoginRequest};
pub use types::{ContextId, ServerUrl, SessionHandle};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
