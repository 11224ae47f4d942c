//! Secret-bearing credential types.
//!
//! Each type wipes its buffer on drop and prints `[REDACTED]` in Debug
//! output, so a secret can only leak by explicitly calling `expose_secret`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

macro_rules! secret_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Zeroizing<String>);

        impl $name {
            /// Wrap a secret value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(Zeroizing::new(value.into()))
            }

            /// Returns the secret value.
            ///
            /// # Security
            ///
            /// Use this only when building the request that needs it.
            /// Never log or display the returned value.
            pub fn expose_secret(&self) -> &str {
                self.0.as_str()
            }

            /// Returns true if the secret is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"[REDACTED]").finish()
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.expose_secret())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                String::deserialize(deserializer).map(Self::new)
            }
        }
    };
}

secret_string!(
    /// A master password or local unlock secret.
    Password
);

secret_string!(
    /// An API client secret, used when the server demands a captcha.
    ClientSecret
);

secret_string!(
    /// A time-based one-time code.
    TotpCode
);

/// Replace every occurrence of the given secrets in `message` with `[REDACTED]`.
///
/// Backend diagnostics pass through this before they are attached to an
/// [`Error`](crate::Error).
pub fn redact(message: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(message.to_string(), |acc, secret| {
            acc.replace(secret, "[REDACTED]")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hides_value_in_debug() {
        let password = Password::new("correct horse");
        let debug = format!("{:?}", password);
        assert!(!debug.contains("correct horse"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn client_secret_hides_value_in_debug() {
        let secret = ClientSecret::new("s3cr3t");
        let debug = format!("{:?}", Some(secret));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn secrets_cross_the_wire_verbatim() {
        let code = TotpCode::new("123456");
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"123456\"");
        let back: TotpCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose_secret(), "123456");
    }

    #[test]
    fn redact_scrubs_all_occurrences() {
        let message = redact("login hunter2 failed: hunter2 rejected", &["hunter2", ""]);
        assert_eq!(message, "login [REDACTED] failed: [REDACTED] rejected");
    }
}
