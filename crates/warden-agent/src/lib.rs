//! warden-agent - The credential agent.
//!
//! [`LocalAgent`] owns one session state machine per user context and
//! implements [`warden_core::CredentialAgent`] in-process. The [`ipc`]
//! module exposes the same trait over a Unix socket.

mod agent;
mod machine;
mod throttle;

#[cfg(unix)]
pub mod ipc;

pub use agent::LocalAgent;
