//! Message transports.
//!
//! A [`Transport`] turns an [`OutgoingMessage`] into one SMTP session:
//! connect, greet, authenticate when credentials are configured, send the
//! envelope, transform the body, send DATA and always finish with QUIT and
//! a disconnect. The strategies differ only in the body transform.

mod pgp;
mod smtp;

pub use pgp::SmtpPgpTransport;
pub use smtp::SmtpTransport;

use crate::config::{ConnectionConfig, TransportKind};
use crate::crypto::{GnuPg, ProtectedBody, ProtectionMode};
use crate::error::Result;
use crate::message::{EncodedMessage, MessageEncoder, OutgoingMessage};
use sealpost_smtp::{LineSocket, Session, TcpSocket};
use std::future::Future;
use tracing::{info, instrument, warn};

/// What was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Header block as transmitted.
    pub headers: String,
    /// Plaintext body after wrapping, before any crypto.
    pub message: String,
    /// Body as transmitted.
    pub body: String,
    /// Protection applied to the body.
    pub mode: ProtectionMode,
}

/// Sends messages.
pub trait Transport: Send + Sync {
    /// Sends `message` over a new connection to the configured server.
    fn send(&self, message: &OutgoingMessage) -> impl Future<Output = Result<SendResult>> + Send;

    /// Sends `message` over `socket`. The socket is disconnected before
    /// this returns, whatever the outcome.
    fn send_over<S: LineSocket>(
        &self,
        socket: S,
        message: &OutgoingMessage,
    ) -> impl Future<Output = Result<SendResult>> + Send;
}

/// A transport chosen by configuration.
#[derive(Debug)]
pub enum AnyTransport {
    /// Plain SMTP.
    Smtp(SmtpTransport),
    /// SMTP with a GnuPG-protected body.
    SmtpPgp(SmtpPgpTransport<GnuPg>),
}

impl AnyTransport {
    /// Builds the transport `config.transport` names.
    ///
    /// `request_host` is the host the caller is serving, used for the
    /// EHLO/HELO name when `client` is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the PGP
    /// transport has no signing identity.
    pub fn from_config(config: ConnectionConfig, request_host: Option<&str>) -> Result<Self> {
        config.validate()?;
        Ok(match config.transport {
            TransportKind::Smtp => Self::Smtp(SmtpTransport::new(config, request_host)),
            TransportKind::SmtpPgp => {
                let engine = GnuPg::from_config(&config);
                Self::SmtpPgp(SmtpPgpTransport::new(config, request_host, engine)?)
            }
        })
    }
}

impl Transport for AnyTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendResult> {
        match self {
            Self::Smtp(t) => t.send(message).await,
            Self::SmtpPgp(t) => t.send(message).await,
        }
    }

    async fn send_over<S: LineSocket>(
        &self,
        socket: S,
        message: &OutgoingMessage,
    ) -> Result<SendResult> {
        match self {
            Self::Smtp(t) => t.send_over(socket, message).await,
            Self::SmtpPgp(t) => t.send_over(socket, message).await,
        }
    }
}

pub(crate) fn tcp_socket(config: &ConnectionConfig) -> TcpSocket {
    TcpSocket::new(
        config.host.clone(),
        config.port,
        config.timeout_duration(),
        config.security.into(),
    )
}

/// Runs one complete session. `protect` receives the CRLF-joined body and
/// the recipient identity once the envelope has been accepted.
///
/// The body is protected before `DATA` is sent, so a crypto failure ends
/// the session without an open data phase. The bytes after `354` are the
/// same as protecting it there.
#[instrument(name = "send", skip_all, fields(host = %config.host, port = config.port, kind = ?config.transport))]
pub(crate) async fn deliver<S, F, Fut>(
    config: &ConnectionConfig,
    client: &str,
    socket: S,
    message: &OutgoingMessage,
    protect: F,
) -> Result<SendResult>
where
    S: LineSocket,
    F: FnOnce(String, String) -> Fut + Send,
    Fut: Future<Output = Result<ProtectedBody>> + Send,
{
    let encoded = MessageEncoder::new(client).encode(message)?;
    let mut session = Session::new(socket, config.timeout_duration());

    let result = transact(&mut session, config, client, &encoded, protect).await;
    match &result {
        Ok(sent) => info!(
            recipients = encoded.envelope.recipients.len(),
            mode = %sent.mode,
            "message sent"
        ),
        Err(e) => warn!(error = %e, state = %session.state(), "send failed"),
    }

    session.quit().await;
    result
}

async fn transact<S, F, Fut>(
    session: &mut Session<S>,
    config: &ConnectionConfig,
    client: &str,
    encoded: &EncodedMessage,
    protect: F,
) -> Result<SendResult>
where
    S: LineSocket,
    F: FnOnce(String, String) -> Fut + Send,
    Fut: Future<Output = Result<ProtectedBody>> + Send,
{
    session.connect().await?;
    session.greet(client).await?;
    if let Some(credentials) = config.smtp_credentials() {
        session.authenticate(&credentials).await?;
    }

    session.mail_from(&encoded.envelope.from).await?;
    for recipient in &encoded.envelope.recipients {
        session.rcpt_to(recipient).await?;
    }

    let protected = protect(encoded.body.clone(), encoded.recipient_identity.clone()).await?;
    let headers = encoded.headers.to_string();
    session.send_data(&headers, &protected.body).await?;

    Ok(SendResult {
        headers,
        message: protected.wrapped,
        body: protected.body,
        mode: protected.mode,
    })
}
