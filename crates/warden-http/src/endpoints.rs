//! Token endpoint request and response types.

use serde::{Deserialize, Serialize};

/// Path of the token endpoint below the server URL.
pub const TOKEN_ENDPOINT: &str = "identity/connect/token";

/// Client id used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "cli";

/// OAuth scope requested on login.
pub const SCOPE: &str = "api offline_access";

/// Device type reported to the server (Linux desktop).
pub const DEVICE_TYPE: &str = "8";

/// Provider number of authenticator-app TOTP.
pub const AUTHENTICATOR_PROVIDER: &str = "0";

/// Form body for the password grant.
///
/// Holds borrowed secrets; never log it.
#[derive(Serialize)]
pub struct PasswordGrant<'a> {
    pub grant_type: &'static str,
    pub username: &'a str,
    pub password: &'a str,
    pub scope: &'static str,
    pub client_id: &'a str,
    #[serde(rename = "deviceType")]
    pub device_type: &'static str,
    #[serde(rename = "deviceIdentifier")]
    pub device_identifier: &'a str,
    #[serde(rename = "deviceName")]
    pub device_name: &'static str,
    #[serde(rename = "captchaResponse", skip_serializing_if = "Option::is_none")]
    pub captcha_response: Option<&'a str>,
    #[serde(rename = "twoFactorToken", skip_serializing_if = "Option::is_none")]
    pub two_factor_token: Option<&'a str>,
    #[serde(rename = "twoFactorProvider", skip_serializing_if = "Option::is_none")]
    pub two_factor_provider: Option<&'static str>,
}

/// Successful token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Error body returned with 400 responses.
#[derive(Debug, Default, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(rename = "TwoFactorProviders", default)]
    pub two_factor_providers: Option<serde_json::Value>,
    #[serde(rename = "HCaptcha_SiteKey", default)]
    pub captcha_site_key: Option<String>,
}

impl TokenErrorResponse {
    /// Provider names from a second-factor challenge.
    pub fn providers(&self) -> Vec<String> {
        let Some(serde_json::Value::Array(values)) = &self.two_factor_providers else {
            return Vec::new();
        };

        values
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .map(|p| provider_name(&p).to_string())
            .collect()
    }
}

fn provider_name(number: &str) -> &str {
    match number {
        "0" => "authenticator",
        "1" => "email",
        "2" => "duo",
        "3" => "yubikey",
        "7" => "webauthn",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_factor_challenge() {
        let body: TokenErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Two factor required.",
                "TwoFactorProviders":["0", 1, "7"]}"#,
        )
        .unwrap();
        assert_eq!(body.providers(), vec!["authenticator", "email", "webauthn"]);
    }

    #[test]
    fn grant_omits_absent_fields() {
        let grant = PasswordGrant {
            grant_type: "password",
            username: "a@example.com",
            password: "pw",
            scope: SCOPE,
            client_id: DEFAULT_CLIENT_ID,
            device_type: DEVICE_TYPE,
            device_identifier: "dev",
            device_name: "warden",
            captcha_response: None,
            two_factor_token: None,
            two_factor_provider: None,
        };
        let value = serde_json::to_value(&grant).unwrap();
        assert!(value.get("twoFactorToken").is_none());
        assert!(value.get("captchaResponse").is_none());
        assert_eq!(value["deviceType"], "8");
    }
}
