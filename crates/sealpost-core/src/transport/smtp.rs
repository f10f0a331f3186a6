//! Plain SMTP transport.

use super::{SendResult, Transport, deliver, tcp_socket};
use crate::config::{ConnectionConfig, resolve_client_name};
use crate::crypto::{ProtectedBody, ProtectionMode};
use crate::error::{Error, Result};
use crate::message::OutgoingMessage;
use sealpost_smtp::LineSocket;

/// Sends the body exactly as composed.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: ConnectionConfig,
    client: String,
}

impl SmtpTransport {
    /// Creates the transport. See [`resolve_client_name`] for `request_host`.
    #[must_use]
    pub fn new(config: ConnectionConfig, request_host: Option<&str>) -> Self {
        let client = resolve_client_name(config.client.as_deref(), request_host);
        Self { config, client }
    }

    /// Returns the EHLO/HELO name.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client
    }
}

impl Transport for SmtpTransport {
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
            |body, _recipient| async move {
                Ok::<_, Error>(ProtectedBody {
                    mode: ProtectionMode::Plain,
                    wrapped: body.clone(),
                    body,
                })
            },
        )
        .await
    }
}
