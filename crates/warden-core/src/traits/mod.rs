//! Core traits for agent and identity backend behavior.

mod agent;
mod identity;

pub use agent::CredentialAgent;
pub use identity::{BackendOutcome, IdentityBackend, LoginRequest};
