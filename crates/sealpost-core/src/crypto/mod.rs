//! Body signing and encryption.
//!
//! [`PgpPolicy`] decides between a clear-signed and a signed-and-encrypted
//! body; a [`CryptoEngine`] does the actual work. [`GnuPg`] drives the `gpg`
//! binary.

mod gnupg;
mod policy;

pub use gnupg::GnuPg;
pub use policy::{PgpPolicy, ProtectedBody, ProtectionMode, WRAP_WIDTH, wrap_text};

use crate::config::ConnectionConfig;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a crypto engine.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No signing key user id is configured.
    #[error("No signing identity configured")]
    MissingIdentity,

    /// The engine binary could not be started.
    #[error("Cannot run {binary}: {source}")]
    Spawn {
        /// Binary that failed to start.
        binary: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported a failure.
    #[error("{operation} failed ({status}): {stderr}")]
    Engine {
        /// What was attempted (`sign`, `sign+encrypt`, ...).
        operation: &'static str,
        /// Exit status description.
        status: String,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Staging input or talking to the engine failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine produced something that is not text.
    #[error("Invalid engine output: {0}")]
    InvalidOutput(String),
}

/// Signing key user id and its passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Key user id (usually an email address).
    pub user_id: String,
    /// Key passphrase.
    pub passphrase: String,
}

impl SigningIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(user_id: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Derives the identity from a configuration: the signing user id and
    /// `pgppassword`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingIdentity`] if no user id can be derived.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, CryptoError> {
        let user_id = config
            .signing_user_id()
            .ok_or(CryptoError::MissingIdentity)?;
        Ok(Self::new(user_id, config.pgppassword.clone()))
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("user_id", &self.user_id)
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// Signing and encryption primitives.
pub trait CryptoEngine: Send + Sync {
    /// Returns true if a public key for `recipient` is available.
    fn key_exists(&self, recipient: &str)
    -> impl Future<Output = Result<bool, CryptoError>> + Send;

    /// Clear-signs `text`.
    fn sign(
        &self,
        text: &str,
        signer: &SigningIdentity,
    ) -> impl Future<Output = Result<String, CryptoError>> + Send;

    /// Signs `text` and encrypts it for `recipient`, ASCII armored.
    fn sign_and_encrypt(
        &self,
        text: &str,
        signer: &SigningIdentity,
        recipient: &str,
    ) -> impl Future<Output = Result<String, CryptoError>> + Send;
}
