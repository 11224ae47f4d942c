//! User context identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a logical user context inside the agent.
///
/// Each context owns one session state machine. Frontends that do not care
/// about multiple contexts use [`ContextId::default`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// The name of the default context.
    pub const DEFAULT: &'static str = "default";

    /// Create a context id. Blank names fall back to the default context.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            Self::default()
        } else {
            Self(name)
        }
    }

    /// Returns the context name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
