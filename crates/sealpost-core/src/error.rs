//! Error types for the core library.

use thiserror::Error;

use crate::crypto::CryptoError;

/// Errors that abort a send.
#[derive(Debug, Error)]
pub enum Error {
    /// SMTP session failed (connect, greeting, auth, envelope, data).
    #[error(transparent)]
    Smtp(#[from] sealpost_smtp::Error),

    /// Signing or encryption failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The outgoing message is unusable.
    #[error("Invalid message: {0}")]
    Message(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if retrying the same send later might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Smtp(e) => {
                e.is_transient()
                    || matches!(
                        e,
                        sealpost_smtp::Error::Timeout(_)
                            | sealpost_smtp::Error::Connection { .. }
                            | sealpost_smtp::Error::Io(_)
                    )
            }
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn smtp_errors_display_transparently() {
        let err = Error::from(sealpost_smtp::Error::protocol("550 nope"));
        assert_eq!(err.to_string(), "SMTP Error: 550 nope");
        assert!(!err.is_transient());
    }

    #[test]
    fn transient_classification() {
        assert!(Error::from(sealpost_smtp::Error::Timeout(Duration::from_secs(1))).is_transient());
        assert!(Error::from(sealpost_smtp::Error::protocol("451 later")).is_transient());
        assert!(!Error::Message("no recipients".into()).is_transient());
        assert!(!Error::from(CryptoError::MissingIdentity).is_transient());
    }
}
