//! Client commands and DATA framing.

use std::fmt;

use crate::types::Address;

/// One client command line.
///
/// `Display` renders the line without its CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <name>`
    Ehlo {
        /// Client name.
        hostname: String,
    },
    /// `HELO <name>`, used when EHLO is refused.
    Helo {
        /// Client name.
        hostname: String,
    },
    /// `AUTH LOGIN`
    AuthLogin,
    /// A bare base64 line sent after a 334 challenge.
    AuthResponse {
        /// Encoded username or password.
        encoded: String,
    },
    /// `MAIL FROM:<addr>`
    MailFrom {
        /// Envelope sender.
        from: Address,
    },
    /// `RCPT TO:<addr>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::Helo { hostname } => write!(f, "HELO {hostname}"),
            Self::AuthLogin => f.write_str("AUTH LOGIN"),
            Self::AuthResponse { encoded } => f.write_str(encoded),
            Self::MailFrom { from } => write!(f, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl Command {
    /// Wire bytes, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// The line as it may be logged. AUTH LOGIN answers are hidden.
    #[must_use]
    pub fn log_text(&self) -> String {
        if matches!(self, Self::AuthResponse { .. }) {
            "<redacted>".to_owned()
        } else {
            self.to_string()
        }
    }
}

/// Builds the payload sent after `354`:
/// `<headers>CRLF CRLF <body> CRLF CRLF CRLF . CRLF`.
///
/// Body lines are rejoined with CRLF whatever their original ending, a
/// single trailing newline is dropped, and any line starting with `.` gets
/// an extra `.` in front.
#[must_use]
pub fn frame_message(headers: &str, body: &str) -> Vec<u8> {
    const TRAILER: &[u8] = b"\r\n\r\n\r\n.\r\n";

    let body = body
        .strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body);

    let mut out = Vec::with_capacity(headers.len() + body.len() + 4 + TRAILER.len());
    out.extend_from_slice(headers.as_bytes());
    out.extend_from_slice(b"\r\n\r\n");

    let mut lines = body.split('\n').map(|l| l.trim_end_matches('\r'));
    if let Some(first) = lines.next() {
        push_stuffed(&mut out, first);
    }
    for line in lines {
        out.extend_from_slice(b"\r\n");
        push_stuffed(&mut out, line);
    }

    out.extend_from_slice(TRAILER);
    out
}

fn push_stuffed(out: &mut Vec<u8>, line: &str) {
    if line.starts_with('.') {
        out.push(b'.');
    }
    out.extend_from_slice(line.as_bytes());
}
