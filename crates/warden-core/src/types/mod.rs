//! Core warden types.
//!
//! These types enforce their invariants at construction time.

mod context_id;
mod server_url;
mod session_handle;

pub use context_id::ContextId;
pub use server_url::ServerUrl;
pub use session_handle::SessionHandle;
