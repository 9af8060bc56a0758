//! Authentication and signing for the Bitget futures APIs.
//!
//! This crate provides secure credential management and request signing
//! for both the REST API and the private WebSocket login handshake.
//!
//! # Features
//!
//! - **Secure Credentials**: the secret key and passphrase are wrapped in
//!   `SecretString` to prevent accidental logging and ensure memory is zeroed
//!   on drop.
//! - **HMAC-SHA256 Signing**: base64-encoded signatures over
//!   `timestamp + method + path + body`, as required by Bitget.
//! - **Environment Loading**: credentials can be loaded from environment
//!   variables or a `.env` file.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::{ApiCredentials, RequestSigner};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let signer = RequestSigner::new(&credentials);
//!
//! // REST request
//! let sign = signer.sign_request("1700000000000", "POST", "/api/v2/mix/order/place-order", body);
//!
//! // WebSocket login
//! let sign = signer.sign_login("1700000000");
//! ```

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::RequestSigner;
