//! # sealpost-smtp
//!
//! The SMTP half of sealpost: a session state machine that speaks the
//! textual command/response protocol over any [`LineSocket`], with a
//! response reader that survives partial reads and enforces a deadline.
//!
//! ## Features
//!
//! - **Deadline-bounded reads**: responses are reassembled across chunks;
//!   a wait that does not produce a CRLF-terminated line in time fails with
//!   [`Error::Timeout`]
//! - **Multi-line replies**: `250-` continuation lines are followed until
//!   the final `250 ` line
//! - **Greeting fallback**: EHLO, then HELO with the same client name
//! - **AUTH LOGIN**: base64 username and password exchange
//! - **Transport**: plain TCP or implicit TLS via rustls
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use sealpost_smtp::{Address, Credentials, Security, Session, TcpSocket};
//!
//! #[tokio::main]
//! async fn main() -> sealpost_smtp::Result<()> {
//!     let timeout = Duration::from_secs(30);
//!     let socket = TcpSocket::new("smtp.example.com", 25, timeout, Security::None);
//!     let mut session = Session::new(socket, timeout);
//!
//!     let result = async {
//!         session.connect().await?;
//!         session.greet("client.example.com").await?;
//!         session.authenticate(&Credentials::new("user", "secret")).await?;
//!         session.mail_from(&Address::new("sender@example.com")?).await?;
//!         session.rcpt_to(&Address::new("recipient@example.com")?).await?;
//!         session.send_data("Subject: Test", "Hello, World!").await
//!     }
//!     .await;
//!
//!     // QUIT and disconnect on every path
//!     session.quit().await;
//!     result.map(|_| ())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Idle ─ connect() → Connected ─ greet() → Greeted ─ authenticate() → Authenticated
//!                                              │                          │
//!                                              └──── mail_from() ─────────┘
//!                                                         │
//!                                     EnvelopeSent ← rcpt_to() (repeatable)
//!                                                         │
//!                                     send_data() → DataSent ─ quit() → Closed
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization and DATA framing
//! - [`connection`]: sockets and the session state machine
//! - [`reader`]: deadline-bounded response reader
//! - [`types`]: addresses and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod reader;
#[cfg(test)]
mod testing;
pub mod types;

pub use connection::{
    Credentials, LineSocket, Security, Session, SessionState, StreamSocket, TcpSocket,
};
pub use error::{Error, Result};
pub use reader::{Expect, ResponseReader};
pub use types::{Address, Mailbox, Reply, ReplyClass, ReplyCode};
