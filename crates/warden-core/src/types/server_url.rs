//! Server URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::error::{ConfigError, Error};

/// A validated identity server URL.
///
/// This type supports both network servers (HTTPS/HTTP) and local
/// filesystem account stores (`file://`).
///
/// # Network URLs
///
/// Network URLs must use HTTPS (or HTTP for loopback hosts).
///
/// # File URLs
///
/// File URLs (`file:///path/to/store`) point the agent at a local account
/// store, for development and testing without a running server.
///
/// # Example
///
/// ```
/// use warden_core::ServerUrl;
///
/// let server = ServerUrl::new("https://vault.example.com").unwrap();
/// assert_eq!(server.endpoint("identity/connect/token"),
///            "https://vault.example.com/identity/connect/token");
///
/// let local = ServerUrl::new("file:///tmp/accounts").unwrap();
/// assert!(local.is_local());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerUrl(Url);

impl ServerUrl {
    /// Create a new server URL from a string, validating the format.
    ///
    /// Validation is syntactic only; no network probe is made.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServer`] if the URL is not acceptable.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref().trim();
        let url = Url::parse(s).map_err(|e| invalid(s, e.to_string()))?;

        Self::validate(&url, s)?;

        // Normalize: remove trailing slash
        let normalized = if url.path() == "/" {
            let mut u = url.clone();
            u.set_path("");
            u
        } else {
            url
        };

        Ok(Self(normalized))
    }

    /// Returns the URL of an endpoint below this server.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns the URL scheme (e.g., "https", "http", "file").
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns true if this is a local account store (file:// URL).
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Returns true if this is a network server (http:// or https:// URL).
    pub fn is_network(&self) -> bool {
        let scheme = self.0.scheme();
        scheme == "http" || scheme == "https"
    }

    /// Returns the filesystem path for file:// URLs.
    ///
    /// Returns `None` for non-file URLs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(invalid(original, "must be an absolute URL"));
        }

        let scheme = url.scheme();

        if scheme == "file" {
            if url.path().is_empty() || url.path() == "/" {
                return Err(invalid(original, "file:// URL must have a path"));
            }
            return Ok(());
        }

        let is_loopback = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_loopback) {
            return Err(invalid(
                original,
                "must use HTTPS (HTTP allowed only for localhost)",
            ));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(original, "must have a host"));
        }

        Ok(())
    }
}

fn invalid(value: &str, reason: impl Into<String>) -> Error {
    ConfigError::InvalidServer {
        value: value.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ServerUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ServerUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ServerUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn valid_https_url() {
        let server = ServerUrl::new("https://vault.bitwarden.com").unwrap();
        assert_eq!(server.host(), Some("vault.bitwarden.com"));
        assert!(server.is_network());
    }

    #[test]
    fn valid_localhost_http() {
        let server = ServerUrl::new("http://localhost:8080").unwrap();
        assert_eq!(server.host(), Some("localhost"));
    }

    #[test]
    fn endpoint_construction_ignores_trailing_slash() {
        let server = ServerUrl::new("https://vault.example.com/").unwrap();
        assert_eq!(
            server.endpoint("/identity/connect/token"),
            "https://vault.example.com/identity/connect/token"
        );
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let server = ServerUrl::new("https://example.com/vault").unwrap();
        assert_eq!(
            server.endpoint("identity/connect/token"),
            "https://example.com/vault/identity/connect/token"
        );
    }

    #[test]
    fn rejects_plain_http_to_remote_host() {
        let err = ServerUrl::new("http://vault.example.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidServer);
    }

    #[test]
    fn rejects_garbage() {
        for value in ["", "not a url", "/relative/path", "mailto:someone@example.com"] {
            let err = ServerUrl::new(value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidServer, "{value}");
        }
    }

    #[test]
    fn valid_file_url() {
        let server = ServerUrl::new("file:///tmp/accounts").unwrap();
        assert!(server.is_local());
        assert!(!server.is_network());
        assert_eq!(server.scheme(), "file");
    }

    #[cfg(unix)]
    #[test]
    fn file_url_to_path() {
        let server = ServerUrl::new("file:///tmp/accounts").unwrap();
        assert_eq!(
            server.to_file_path().unwrap(),
            std::path::PathBuf::from("/tmp/accounts")
        );
    }

    #[test]
    fn deserialize_validates() {
        let result: Result<ServerUrl, _> = serde_json::from_str("\"http://example.com\"");
        assert!(result.is_err());
    }
}
