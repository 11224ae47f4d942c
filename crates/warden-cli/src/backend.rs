//! Identity backend selection by server URL scheme.

use async_trait::async_trait;

use warden_core::error::ConfigError;
use warden_core::{BackendOutcome, IdentityBackend, LoginRequest, Result, ServerConfig};
use warden_file::FileIdentity;
use warden_http::HttpIdentity;

/// Dispatches each attempt to the file store or the HTTP server, depending
/// on the URL in that attempt's configuration snapshot.
#[derive(Debug)]
pub struct RoutedIdentity {
    file: FileIdentity,
    http: HttpIdentity,
}

impl RoutedIdentity {
    pub fn new(file: FileIdentity, http: HttpIdentity) -> Self {
        Self { file, http }
    }
}

#[async_trait]
impl IdentityBackend for RoutedIdentity {
    async fn authenticate(
        &self,
        server: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> Result<BackendOutcome> {
        match &server.server_url {
            Some(url) if url.is_local() => self.file.authenticate(server, request).await,
            Some(_) => self.http.authenticate(server, request).await,
            None => Err(ConfigError::InvalidServer {
                value: String::new(),
                reason: "no server configured".to_string(),
            }
            .into()),
        }
    }
}
