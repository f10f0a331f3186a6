//! SMTP transport with a signed, and when possible encrypted, body.

use super::{SendResult, Transport, deliver, tcp_socket};
use crate::config::{ConnectionConfig, resolve_client_name};
use crate::crypto::{CryptoEngine, PgpPolicy, SigningIdentity};
use crate::error::{Error, Result};
use crate::message::OutgoingMessage;
use sealpost_smtp::LineSocket;

/// Wraps the body at 70 columns and clear-signs it, or signs and encrypts
/// it when the `To` recipient has a public key.
///
/// The signing key defaults to the SMTP username (see
/// [`ConnectionConfig::signing_user_id`]) unlocked with `pgppassword`.
#[derive(Debug, Clone)]
pub struct SmtpPgpTransport<E> {
    config: ConnectionConfig,
    client: String,
    engine: E,
    signer: SigningIdentity,
    policy: PgpPolicy,
}

impl<E: CryptoEngine> SmtpPgpTransport<E> {
    /// Creates the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if no signing identity can be derived.
    pub fn new(config: ConnectionConfig, request_host: Option<&str>, engine: E) -> Result<Self> {
        let signer = SigningIdentity::from_config(&config)?;
        let client = resolve_client_name(config.client.as_deref(), request_host);
        Ok(Self {
            config,
            client,
            engine,
            signer,
            policy: PgpPolicy::default(),
        })
    }

    /// Replaces the wrapping policy.
    #[must_use]
    pub const fn policy(mut self, policy: PgpPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: CryptoEngine> Transport for SmtpPgpTransport<E> {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendResult> {
        self.send_over(tcp_socket(&self.config), message).await
    }

    async fn send_over<S: LineSocket>(
        &self,
        socket: S,
        message: &OutgoingMessage,
    ) -> Result<SendResult> {
        deliver(
            &self.config,
            &self.client,
            socket,
            message,
            |body, recipient| async move {
                self.policy
                    .protect(&self.engine, &body, &self.signer, &recipient)
                    .await
                    .map_err(Error::from)
            },
        )
        .await
    }
}
