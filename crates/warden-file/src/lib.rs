//! warden-file - Filesystem-backed identity backend.
//!
//! Points the agent at a `file://` server URL holding local accounts, so the
//! whole login flow (including TOTP) can run without a network server.

mod identity;
mod store;
pub mod totp;

pub use identity::FileIdentity;
pub use store::{FileStore, LocalAccount};
