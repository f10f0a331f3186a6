//! Transport configuration.
//!
//! The JSON form uses the keys `host`, `port`, `timeout`, `username`,
//! `password`, `pgppassword` and `client`, plus a few sealpost-specific
//! ones. Every key has a default.

mod validation;

pub use validation::{ValidationError, ValidationResult, validate_config};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which send strategy a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Plain SMTP; the body is sent as given.
    Smtp,
    /// SMTP with a PGP-signed, and when possible encrypted, body.
    #[default]
    SmtpPgp,
}

/// Security/encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    /// No encryption.
    #[default]
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
}

impl From<Security> for sealpost_smtp::Security {
    fn from(security: Security) -> Self {
        match security {
            Security::None => Self::None,
            Security::Tls => Self::Tls,
        }
    }
}

/// SMTP connection and signing configuration.
///
/// Immutable for the duration of a send.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Send strategy.
    pub transport: TransportKind,
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Seconds to wait for each server response (and for the connect).
    pub timeout: u64,
    /// Connection security.
    pub security: Security,
    /// Name announced in EHLO/HELO; see [`resolve_client_name`].
    pub client: Option<String>,
    /// SMTP account name. AUTH LOGIN runs only when this and `password`
    /// are both set.
    pub username: Option<String>,
    /// SMTP account password.
    pub password: Option<String>,
    /// Passphrase of the signing key.
    pub pgppassword: String,
    /// Signing key user id. Falls back to `username`.
    pub pgp_identity: Option<String>,
    /// GnuPG home directory holding the keyring.
    pub gnupg_home: Option<PathBuf>,
    /// GnuPG executable.
    pub gpg_binary: PathBuf,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: "localhost".to_string(),
            port: 25,
            timeout: 30,
            security: Security::None,
            client: None,
            username: None,
            password: None,
            pgppassword: String::new(),
            pgp_identity: None,
            gnupg_home: None,
            gpg_binary: PathBuf::from("gpg"),
        }
    }
}

impl ConnectionConfig {
    /// Creates a default configuration for `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result fails
    /// validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Checks the configuration, folding all problems into one error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_config(self).map_err(|errors| {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.field(), e.message()))
                .collect();
            Error::Config(messages.join("; "))
        })
    }

    /// Sets the transport strategy.
    #[must_use]
    pub const fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the response timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Sets the connection security.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the EHLO/HELO client name override.
    #[must_use]
    pub fn client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Sets the SMTP credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the signing key passphrase.
    #[must_use]
    pub fn pgp_password(mut self, passphrase: impl Into<String>) -> Self {
        self.pgppassword = passphrase.into();
        self
    }

    /// Sets the signing key user id.
    #[must_use]
    pub fn pgp_identity(mut self, identity: impl Into<String>) -> Self {
        self.pgp_identity = Some(identity.into());
        self
    }

    /// Sets the GnuPG home directory.
    #[must_use]
    pub fn gnupg_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.gnupg_home = Some(path.into());
        self
    }

    /// Returns the response timeout.
    #[must_use]
    pub const fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the credentials to authenticate with, if both halves are set.
    #[must_use]
    pub fn smtp_credentials(&self) -> Option<sealpost_smtp::Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(sealpost_smtp::Credentials::new(username, password))
            }
            _ => None,
        }
    }

    /// Returns the signing key user id.
    ///
    /// This is the SMTP `username` unless `pgp_identity` is set, so by
    /// default the mail account and the signing key are the same identity.
    #[must_use]
    pub fn signing_user_id(&self) -> Option<&str> {
        self.pgp_identity
            .as_deref()
            .or(self.username.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Returns the keyring directory, defaulting to `~/.gnupg`.
    #[must_use]
    pub fn keyring_dir(&self) -> Option<PathBuf> {
        self.gnupg_home
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".gnupg")))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |set: bool| if set { "<redacted>" } else { "<unset>" };
        f.debug_struct("ConnectionConfig")
            .field("transport", &self.transport)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("security", &self.security)
            .field("client", &self.client)
            .field("username", &self.username)
            .field("password", &redact(self.password.is_some()))
            .field("pgppassword", &redact(!self.pgppassword.is_empty()))
            .field("pgp_identity", &self.pgp_identity)
            .field("gnupg_home", &self.gnupg_home)
            .field("gpg_binary", &self.gpg_binary)
            .finish()
    }
}

/// Picks the name announced in EHLO/HELO.
///
/// An explicit override wins; otherwise the host part of the request host
/// (anything before a `:` port suffix); otherwise `localhost`.
#[must_use]
pub fn resolve_client_name(client: Option<&str>, request_host: Option<&str>) -> String {
    if let Some(client) = client {
        return client.to_string();
    }
    request_host
        .and_then(|host| host.split(':').next())
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost")
        .to_string()
}
