//! Configuration validation.

use super::{ConnectionConfig, TransportKind};

/// Validation error for a connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Host is empty.
    EmptyHost,
    /// Port is zero.
    InvalidPort,
    /// Timeout is zero.
    ZeroTimeout,
    /// Client name override contains whitespace or is empty.
    InvalidClient,
    /// PGP transport selected but no signing identity can be derived.
    MissingSigningIdentity,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyHost => "SMTP server is required",
            Self::InvalidPort => "SMTP port must be 1-65535",
            Self::ZeroTimeout => "Timeout must be at least one second",
            Self::InvalidClient => "Client name must be a single non-empty word",
            Self::MissingSigningIdentity => "PGP signing needs a username or pgp_identity",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
            Self::ZeroTimeout => "timeout",
            Self::InvalidClient => "client",
            Self::MissingSigningIdentity => "pgp_identity",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a connection configuration.
///
/// # Errors
///
/// Returns every problem found, not just the first.
pub fn validate_config(config: &ConnectionConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.timeout == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config
        .client
        .as_deref()
        .is_some_and(|client| client.is_empty() || client.chars().any(char::is_whitespace))
    {
        errors.push(ValidationError::InvalidClient);
    }
    if config.transport == TransportKind::SmtpPgp && config.signing_user_id().is_none() {
        errors.push(ValidationError::MissingSigningIdentity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
