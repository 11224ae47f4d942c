//! warden-http - Identity backend for a password-grant token endpoint.

mod endpoints;
mod identity;

pub use identity::{HttpIdentity, HttpIdentityConfig};
