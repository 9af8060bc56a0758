//! Bitget API key triple.
//!
//! Secret key and passphrase live in `secrecy::SecretString`, which keeps
//! them out of `Debug` output and zeroes them on drop.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

const API_KEY_VAR: &str = "BITGET_API_KEY";
const SECRET_KEY_VAR: &str = "BITGET_SECRET_KEY";
const PASSPHRASE_VAR: &str = "BITGET_PASSPHRASE";

/// Bitget keys come as a triple: the public API key, the secret used for
/// HMAC signing and the passphrase chosen when the key was created. Only the
/// API key is safe to log.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
    passphrase: SecretString,
}

impl ApiCredentials {
    /// Read `BITGET_API_KEY`, `BITGET_SECRET_KEY` and `BITGET_PASSPHRASE`,
    /// after loading a `.env` file when one exists.
    ///
    /// Returns `AuthError::MissingEnvVar` if any variable is not set and
    /// `AuthError::EmptyField` if one is set to an empty string.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();

        let api_key = read_var(API_KEY_VAR)?;
        let secret_key = read_var(SECRET_KEY_VAR)?;
        let passphrase = read_var(PASSPHRASE_VAR)?;

        let credentials = Self::new(api_key, secret_key, passphrase);
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
            passphrase: SecretString::from(passphrase),
        }
    }

    /// Reject credentials with empty fields.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.api_key.is_empty() {
            return Err(AuthError::EmptyField("api_key"));
        }
        if self.secret_key.expose_secret().is_empty() {
            return Err(AuthError::EmptyField("secret_key"));
        }
        if self.passphrase.expose_secret().is_empty() {
            return Err(AuthError::EmptyField("passphrase"));
        }
        Ok(())
    }

    /// The public key; safe to log.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// HMAC key. Only the signer should call this.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }

    /// Expose the passphrase for request headers and the login frame.
    pub fn expose_passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

fn read_var(name: &str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::MissingEnvVar(name.into()))
}
