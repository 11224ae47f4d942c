//! Default paths and the daemon's optional config file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use warden_core::AgentConfig;

/// Daemon settings read from a JSON file. Every field is optional.
///
/// ```json
/// { "agent": { "max_failed_attempts": 3 }, "http_timeout_secs": 10 }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub agent: AgentConfig,
    pub http_timeout_secs: Option<u64>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load the given file, else `config.json` in the config dir if present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match project_dirs() {
            Ok(dirs) => {
                let path = dirs.config_dir().join("config.json");
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "warden").context("Could not determine data directory")
}

/// Socket path used when `--socket` is not given.
pub fn default_socket_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("agent.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"agent":{"max_failed_attempts":3,"base_backoff":5},"http_timeout_secs":10}"#,
        )
        .unwrap();

        let config = DaemonConfig::load(&path).unwrap();
        assert_eq!(config.agent.max_failed_attempts, 3);
        assert_eq!(config.agent.base_backoff, Duration::from_secs(5));
        assert_eq!(
            config.agent.unlock_hash_cost,
            AgentConfig::default().unlock_hash_cost
        );
        assert_eq!(config.http_timeout_secs, Some(10));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"agnet":{}}"#).unwrap();

        assert!(DaemonConfig::load(&path).is_err());
    }
}
