//! HTTP identity backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use warden_core::error::{AuthError, ConfigError, Error, PolicyError, TransportError};
use warden_core::{
    AccessToken, BackendOutcome, IdentityBackend, LoginRequest, Result, ServerConfig, redact,
};

use crate::endpoints::*;

/// Settings for [`HttpIdentity`].
#[derive(Debug, Clone)]
pub struct HttpIdentityConfig {
    /// Upper bound on one token request.
    pub request_timeout: Duration,
    /// Stable identifier reported as `deviceIdentifier`.
    pub device_identifier: String,
}

impl Default for HttpIdentityConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            device_identifier: Uuid::new_v4().to_string(),
        }
    }
}

/// Identity backend speaking the password grant of a token endpoint.
#[derive(Debug, Clone)]
pub struct HttpIdentity {
    client: reqwest::Client,
    config: HttpIdentityConfig,
}

impl HttpIdentity {
    /// Create a backend with its own HTTP client.
    pub fn new(config: HttpIdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                Error::Transport(TransportError::Backend {
                    message: format!("failed to build HTTP client: {}", e),
                })
            })?;

        Ok(Self { client, config })
    }

    fn classify_transport(&self, err: reqwest::Error, secrets: &[&str]) -> Error {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: self.config.request_timeout.as_millis() as u64,
            }
            .into()
        } else {
            TransportError::Backend {
                message: redact(&err.to_string(), secrets),
            }
            .into()
        }
    }

    /// Map a non-success response to the error taxonomy.
    async fn classify_failure(
        &self,
        response: reqwest::Response,
        sent_totp: bool,
        secrets: &[&str],
    ) -> Result<BackendOutcome> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(0, |secs| secs.saturating_mul(1000));
            return Err(PolicyError::RateLimited { retry_after_ms }.into());
        }

        let text = response.text().await.unwrap_or_default();
        let body: TokenErrorResponse = serde_json::from_str(&text).unwrap_or_default();
        trace!(%status, error = ?body.error, "Token endpoint refused");

        if status == StatusCode::BAD_REQUEST {
            if body.captcha_site_key.is_some() {
                return Err(PolicyError::CaptchaRequired.into());
            }

            if body.two_factor_providers.is_some() {
                if sent_totp {
                    return Err(AuthError::BadTotp.into());
                }
                return Ok(BackendOutcome::SecondFactorRequired {
                    providers: body.providers(),
                });
            }

            if body.error.as_deref() == Some("invalid_grant") {
                return Err(AuthError::BadPassword.into());
            }
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::BadPassword.into());
        }

        let mut message = format!("HTTP {}", status.as_u16());
        if let Some(description) = body.error_description.or(body.error) {
            message.push_str(": ");
            message.push_str(&description);
        }
        warn!(%status, "Unexpected token endpoint response");

        Err(TransportError::Backend {
            message: redact(&message, secrets),
        }
        .into())
    }
}

#[async_trait]
impl IdentityBackend for HttpIdentity {
    #[instrument(skip(self, server, request), fields(email = %request.email))]
    async fn authenticate(
        &self,
        server: &ServerConfig,
        request: &LoginRequest<'_>,
    ) -> Result<BackendOutcome> {
        let url = server
            .server_url
            .as_ref()
            .filter(|url| url.is_network())
            .ok_or_else(|| ConfigError::InvalidServer {
                value: server
                    .server_url
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                reason: "no network server configured".to_string(),
            })?;

        let endpoint = url.endpoint(TOKEN_ENDPOINT);
        let password = request.password.expose_secret();
        let client_secret = server.client_secret.as_ref().map(|s| s.expose_secret());
        let totp = request.totp.map(|code| code.expose_secret().trim());

        let grant = PasswordGrant {
            grant_type: "password",
            username: request.email,
            password,
            scope: SCOPE,
            client_id: server.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID),
            device_type: DEVICE_TYPE,
            device_identifier: &self.config.device_identifier,
            device_name: "warden",
            captcha_response: client_secret,
            two_factor_token: totp,
            two_factor_provider: totp.map(|_| AUTHENTICATOR_PROVIDER),
        };

        let mut secrets = vec![password];
        secrets.extend(client_secret);
        secrets.extend(totp);

        debug!(%endpoint, "Requesting token");

        let response = self
            .client
            .post(&endpoint)
            .form(&grant)
            .send()
            .await
            .map_err(|e| self.classify_transport(e, &secrets))?;

        if response.status().is_success() {
            let body: TokenResponse = response
                .json()
                .await
                .map_err(|e| self.classify_transport(e, &secrets))?;
            debug!("Token issued");
            return Ok(BackendOutcome::Authenticated {
                access_token: AccessToken::new(body.access_token),
            });
        }

        self.classify_failure(response, totp.is_some(), &secrets)
            .await
    }
}
