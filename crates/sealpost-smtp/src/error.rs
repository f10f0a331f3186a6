//! Error types for SMTP sessions.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
///
/// Every variant aborts the send that produced it; there is no partially
/// successful session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The socket could not be opened.
    #[error("Unable to connect to SMTP server {host}:{port}: {reason}")]
    Connection {
        /// Server host.
        host: String,
        /// Server port.
        port: u16,
        /// Underlying cause.
        reason: String,
    },

    /// No complete response line arrived before the deadline.
    #[error("SMTP timeout after {0:?}")]
    Timeout(Duration),

    /// Both EHLO and HELO were refused.
    #[error("SMTP server did not accept the connection")]
    GreetingRejected,

    /// `AUTH LOGIN` was answered with neither 334 nor 503.
    #[error("SMTP server does not support AUTH LOGIN: {0}")]
    AuthNotSupported(String),

    /// The base64 username was refused.
    #[error("SMTP server did not accept the username: {0}")]
    AuthUsernameRejected(String),

    /// The base64 password was refused.
    #[error("SMTP server did not accept the password: {0}")]
    AuthPasswordRejected(String),

    /// Server answered with a code that was not expected.
    #[error("SMTP Error: {response}")]
    Protocol {
        /// Last response line, verbatim.
        response: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a protocol error from the offending response line.
    #[must_use]
    pub fn protocol(response: impl Into<String>) -> Self {
        Self::Protocol {
            response: response.into(),
        }
    }

    /// Returns the raw server text carried by this error, if any.
    #[must_use]
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Protocol { response }
            | Self::AuthNotSupported(response)
            | Self::AuthUsernameRejected(response)
            | Self::AuthPasswordRejected(response) => Some(response),
            _ => None,
        }
    }

    /// Returns the reply code carried by the server text, if it has one.
    #[must_use]
    pub fn reply_code(&self) -> Option<u16> {
        let response = self.response()?;
        response.get(..3)?.parse().ok()
    }

    /// Returns true if the server rejected the command permanently (5xx).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self.reply_code(), Some(code) if (500..600).contains(&code))
    }

    /// Returns true if the server rejected the command transiently (4xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.reply_code(), Some(code) if (400..500).contains(&code))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_keeps_raw_line() {
        let err = Error::protocol("550 5.1.1 No such user");
        assert_eq!(err.to_string(), "SMTP Error: 550 5.1.1 No such user");
        assert_eq!(err.response(), Some("550 5.1.1 No such user"));
        assert_eq!(err.reply_code(), Some(550));
        assert!(err.is_permanent());
        assert!(!err.is_transient());
    }

    #[test]
    fn transient_classification() {
        let err = Error::AuthPasswordRejected("454 4.7.0 Try again later".into());
        assert!(err.is_transient());
        assert!(!err.is_permanent());
    }

    #[test]
    fn timeout_has_no_code() {
        let err = Error::Timeout(Duration::from_secs(5));
        assert_eq!(err.reply_code(), None);
        assert!(!err.is_permanent());
    }
}
