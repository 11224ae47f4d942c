//! Server, agent and client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::credentials::ClientSecret;
use crate::types::ServerUrl;

/// Which backend the agent authenticates against, plus optional API client
/// credentials.
///
/// Owned by the agent. Login attempts work on a clone taken when the
/// attempt starts, so a concurrent `set_*` never changes an attempt midway.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub server_url: Option<ServerUrl>,
    pub client_id: Option<String>,
    pub client_secret: Option<ClientSecret>,
}

/// Tunables for the credential agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Failed attempts tolerated inside `failure_window` before backing off.
    pub max_failed_attempts: u32,

    /// Sliding window in which failures are counted.
    #[serde(with = "duration_secs")]
    pub failure_window: Duration,

    /// First backoff once the threshold is hit; doubles per further failure.
    #[serde(with = "duration_secs")]
    pub base_backoff: Duration,

    /// Upper bound on a single backoff.
    #[serde(with = "duration_secs")]
    pub max_backoff: Duration,

    /// bcrypt cost used for the local unlock secret.
    pub unlock_hash_cost: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            failure_window: Duration::from_secs(15 * 60),
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(15 * 60),
            unlock_hash_cost: 12,
        }
    }
}

/// Tunables for the session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound on any single call to the agent.
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
