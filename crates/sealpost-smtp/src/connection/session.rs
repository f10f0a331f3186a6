//! SMTP session state machine.

use super::LineSocket;
use crate::command::{Command, frame_message};
use crate::error::{Error, Result};
use crate::reader::{Expect, ResponseReader};
use crate::types::{Address, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a session is in the connect → greet → auth → envelope → data →
/// quit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket not opened yet.
    Idle,
    /// Socket open and `220` received.
    Connected,
    /// EHLO or HELO accepted.
    Greeted,
    /// AUTH LOGIN completed (or the server said it was not needed).
    Authenticated,
    /// MAIL FROM accepted; recipients are being added.
    EnvelopeSent,
    /// Message accepted after the terminating dot.
    DataSent,
    /// QUIT sent and socket closed.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::Authenticated => "authenticated",
            Self::EnvelopeSent => "envelope sent",
            Self::DataSent => "data sent",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Username and password for AUTH LOGIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One SMTP conversation over a [`LineSocket`].
///
/// Each step checks the state it is called from and the reply code the
/// server answers with; any mismatch is an error and the caller is expected
/// to abandon the send and call [`Session::quit`].
#[derive(Debug)]
pub struct Session<S> {
    socket: S,
    reader: ResponseReader,
    state: SessionState,
}

impl<S: LineSocket> Session<S> {
    /// Creates an idle session. `timeout` bounds every response wait.
    #[must_use]
    pub const fn new(socket: S, timeout: Duration) -> Self {
        Self {
            socket,
            reader: ResponseReader::new(timeout),
            state: SessionState::Idle,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the underlying socket.
    #[must_use]
    pub const fn socket(&self) -> &S {
        &self.socket
    }

    /// Opens the socket and waits for the `220` banner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be opened, or a
    /// reader error if the banner is missing or not `220`.
    pub async fn connect(&mut self) -> Result<Reply> {
        self.require(&[SessionState::Idle], "connect")?;
        self.socket.connect().await?;
        let banner = self
            .reader
            .read_checked(&mut self.socket, &[ReplyCode::SERVICE_READY])
            .await?;
        debug!(banner = %banner.message_text(), "connected");
        self.state = SessionState::Connected;
        Ok(banner)
    }

    /// Introduces the client with EHLO, falling back to HELO once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GreetingRejected`] if both are refused or time out.
    pub async fn greet(&mut self, client: &str) -> Result<Reply> {
        self.require(&[SessionState::Connected], "greet")?;
        let ehlo = Command::Ehlo {
            hostname: client.to_string(),
        };
        let reply = match self.expect(ehlo, &[ReplyCode::OK]).await {
            Ok(reply) => reply,
            Err(e @ (Error::Protocol { .. } | Error::Timeout(_))) => {
                warn!(error = %e, "EHLO refused, falling back to HELO");
                let helo = Command::Helo {
                    hostname: client.to_string(),
                };
                match self.expect(helo, &[ReplyCode::OK]).await {
                    Ok(reply) => reply,
                    Err(Error::Protocol { .. } | Error::Timeout(_)) => {
                        return Err(Error::GreetingRejected);
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        self.state = SessionState::Greeted;
        Ok(reply)
    }

    /// Runs AUTH LOGIN with base64 encoded username and password.
    ///
    /// A `503` answer to `AUTH LOGIN` means no authentication is needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthNotSupported`], [`Error::AuthUsernameRejected`]
    /// or [`Error::AuthPasswordRejected`] depending on the refused step.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        self.require(&[SessionState::Greeted], "authenticate")?;

        let reply = self
            .expect(
                Command::AuthLogin,
                &[ReplyCode::AUTH_CONTINUE, ReplyCode::BAD_SEQUENCE],
            )
            .await
            .map_err(|e| match e {
                Error::Protocol { response } => Error::AuthNotSupported(response),
                other => other,
            })?;

        if reply.code == ReplyCode::BAD_SEQUENCE {
            debug!("server reports authentication is not required");
            self.state = SessionState::Authenticated;
            return Ok(());
        }

        let username = Command::AuthResponse {
            encoded: STANDARD.encode(credentials.username.as_bytes()),
        };
        self.expect(username, &[ReplyCode::AUTH_CONTINUE])
            .await
            .map_err(|e| match e {
                Error::Protocol { response } => Error::AuthUsernameRejected(response),
                other => other,
            })?;

        let password = Command::AuthResponse {
            encoded: STANDARD.encode(credentials.password.as_bytes()),
        };
        self.expect(password, &[ReplyCode::AUTH_SUCCESS])
            .await
            .map_err(|e| match e {
                Error::Protocol { response } => Error::AuthPasswordRejected(response),
                other => other,
            })?;

        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Starts the envelope with `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] unless the server answers `250`.
    pub async fn mail_from(&mut self, from: &Address) -> Result<Reply> {
        self.require(
            &[SessionState::Greeted, SessionState::Authenticated],
            "MAIL FROM",
        )?;
        let reply = self
            .expect(Command::MailFrom { from: from.clone() }, &[ReplyCode::OK])
            .await?;
        self.state = SessionState::EnvelopeSent;
        Ok(reply)
    }

    /// Adds one envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] unless the server answers `250`.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<Reply> {
        self.require(&[SessionState::EnvelopeSent], "RCPT TO")?;
        self.expect(Command::RcptTo { to: to.clone() }, &[ReplyCode::OK])
            .await
    }

    /// Sends `DATA`, then the framed message in one write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] unless the server answers `354` to DATA
    /// and `250` to the message.
    pub async fn send_data(&mut self, headers: &str, body: &str) -> Result<Reply> {
        self.require(&[SessionState::EnvelopeSent], "DATA")?;
        self.expect(Command::Data, &[ReplyCode::START_DATA]).await?;

        let framed = frame_message(headers, body);
        debug!(bytes = framed.len(), "C: <message>");
        self.socket.write(&framed).await?;
        let reply = self
            .reader
            .read_checked(&mut self.socket, &[ReplyCode::OK])
            .await?;
        self.state = SessionState::DataSent;
        Ok(reply)
    }

    /// Sends `QUIT` without waiting for an answer and closes the socket.
    ///
    /// Safe to call from any state, including after a failure. Never fails.
    pub async fn quit(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if !matches!(self.state, SessionState::Idle) {
            if let Err(e) = self.send(&Command::Quit, &Expect::Unchecked).await {
                warn!(error = %e, "QUIT could not be sent");
            }
        }
        self.socket.disconnect().await;
        self.state = SessionState::Closed;
    }

    async fn expect(&mut self, cmd: Command, codes: &[ReplyCode]) -> Result<Reply> {
        self.write_command(&cmd).await?;
        self.reader.read_checked(&mut self.socket, codes).await
    }

    async fn send(&mut self, cmd: &Command, expect: &Expect) -> Result<Option<Reply>> {
        self.write_command(cmd).await?;
        self.reader.read(&mut self.socket, expect).await
    }

    async fn write_command(&mut self, cmd: &Command) -> Result<()> {
        debug!(command = %cmd.log_text(), "C:");
        self.socket.write(&cmd.serialize()).await
    }

    fn require(&self, allowed: &[SessionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} is not allowed while {}",
                self.state
            )))
        }
    }
}
