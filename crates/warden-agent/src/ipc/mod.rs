//! Local IPC transport for the agent.
//!
//! Newline-delimited JSON over a Unix socket: the daemon wraps a
//! [`crate::LocalAgent`] in an [`IpcServer`], frontends talk to it through
//! an [`IpcAgent`], which implements the same
//! [`warden_core::CredentialAgent`] trait.

mod client;
mod messages;
mod server;

pub use client::IpcAgent;
pub use messages::{Operation, Request, Response};
pub use server::IpcServer;
