//! Sockets and the SMTP session state machine.

mod session;
mod socket;

pub use session::{Credentials, Session, SessionState};
pub use socket::{LineSocket, StreamSocket, TcpSocket};

/// Transport security of a [`TcpSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plain TCP.
    #[default]
    None,
    /// TLS from the first byte (SMTPS).
    Tls,
}

impl Security {
    /// Returns the conventional port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Tls => 465,
        }
    }
}
