//! # sealpost-core
//!
//! Sends plain text email over SMTP with a PGP-protected body.
//!
//! This crate provides:
//! - **Configuration**: the JSON connection settings and their validation
//! - **Message encoding**: header block, envelope and the JSON message form
//! - **Crypto policy**: wrap at 70 columns, then clear-sign, or sign and
//!   encrypt when the recipient's public key is in the keyring
//! - **Transports**: plain SMTP and SMTP+PGP strategies behind one
//!   [`Transport`] trait, picked from configuration
//!
//! ## Example
//!
//! ```ignore
//! use sealpost_core::{AnyTransport, ConnectionConfig, OutgoingMessage, Transport};
//!
//! # async fn run() -> sealpost_core::Result<()> {
//! let config = ConnectionConfig::load("config.json")?;
//! let message = OutgoingMessage::load("message.json")?;
//! let transport = AnyTransport::from_config(config, None)?;
//! let sent = transport.send(&message).await?;
//! println!("{}\n\n{}", sent.headers, sent.body);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
mod error;
pub mod message;
#[cfg(test)]
mod testing;
pub mod transport;

pub use config::{
    ConnectionConfig, Security, TransportKind, ValidationError, ValidationResult,
    resolve_client_name, validate_config,
};
pub use crypto::{
    CryptoEngine, CryptoError, GnuPg, PgpPolicy, ProtectedBody, ProtectionMode, SigningIdentity,
    wrap_text,
};
pub use error::{Error, Result};
pub use message::{EncodedMessage, Envelope, HeaderBlock, MessageEncoder, OutgoingMessage};
pub use transport::{AnyTransport, SendResult, SmtpPgpTransport, SmtpTransport, Transport};

pub use sealpost_smtp::{Address, Mailbox};
