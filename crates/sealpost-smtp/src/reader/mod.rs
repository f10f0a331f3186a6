//! Deadline-bounded SMTP response reader.
//!
//! A response is read by accumulating socket chunks until the buffer ends
//! in CRLF. Only the last line of the buffer is evaluated:
//!
//! - `250-...` (expected code followed by `-`): continuation, wait again
//!   with a fresh deadline.
//! - `250 ...` or a bare `250`: done.
//! - anything else: [`Error::Protocol`] carrying that line verbatim.

use crate::connection::LineSocket;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};
use bytes::BytesMut;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::trace;

/// Which reply codes a command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Any of these codes ends the wait successfully.
    Codes(Vec<ReplyCode>),
    /// Do not read a response at all.
    Unchecked,
}

impl Expect {
    /// Expects exactly one code.
    #[must_use]
    pub fn code(code: ReplyCode) -> Self {
        Self::Codes(vec![code])
    }

    /// Expects any of the given codes.
    #[must_use]
    pub fn any_of(codes: &[ReplyCode]) -> Self {
        Self::Codes(codes.to_vec())
    }

    /// Returns true if `code` satisfies this expectation.
    #[must_use]
    pub fn matches(&self, code: ReplyCode) -> bool {
        match self {
            Self::Codes(codes) => codes.contains(&code),
            Self::Unchecked => true,
        }
    }
}

/// Parses `"250"` or an alternation such as `"334|503"`.
impl FromStr for Expect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let codes = s
            .split('|')
            .map(|part| {
                let part = part.trim();
                match ReplyCode::from_line(part) {
                    Some(code) if part.len() == 3 => Ok(code),
                    _ => Err(Error::InvalidState(format!("invalid reply code: {part:?}"))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Codes(codes))
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codes(codes) => {
                for (i, code) in codes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{code}")?;
                }
                Ok(())
            }
            Self::Unchecked => f.write_str("unchecked"),
        }
    }
}

/// How the last line of a buffer relates to the expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStatus {
    Continuation,
    Final(ReplyCode),
    Mismatch,
}

fn classify(line: &str, codes: &[ReplyCode]) -> LineStatus {
    match ReplyCode::from_line(line) {
        Some(code) if codes.contains(&code) => {
            if line.as_bytes().get(3) == Some(&b'-') {
                LineStatus::Continuation
            } else {
                LineStatus::Final(code)
            }
        }
        _ => LineStatus::Mismatch,
    }
}

/// Reads SMTP responses from a [`LineSocket`] within a per-wait timeout.
#[derive(Debug, Clone, Copy)]
pub struct ResponseReader {
    timeout: Duration,
}

impl ResponseReader {
    /// Creates a reader whose every wait is bounded by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Reads one response, or nothing when `expect` is [`Expect::Unchecked`].
    ///
    /// # Errors
    ///
    /// See [`ResponseReader::read_checked`].
    pub async fn read<S: LineSocket>(&self, socket: &mut S, expect: &Expect) -> Result<Option<Reply>> {
        match expect {
            Expect::Codes(codes) => self.read_checked(socket, codes).await.map(Some),
            Expect::Unchecked => Ok(None),
        }
    }

    /// Reads until a final line with one of `codes` arrives.
    ///
    /// The returned reply holds every line received, continuation lines
    /// included.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no CRLF-terminated buffer is assembled before
    ///   the deadline. Partial data is never matched.
    /// - [`Error::Protocol`] if the last line does not carry an expected code.
    /// - Whatever the socket returns from `read`.
    pub async fn read_checked<S: LineSocket>(
        &self,
        socket: &mut S,
        codes: &[ReplyCode],
    ) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let received = self.wait_for_lines(socket).await?;
            let last = received.last().cloned().unwrap_or_default();
            lines.extend(received);

            match classify(&last, codes) {
                LineStatus::Continuation => {}
                LineStatus::Final(code) => return Ok(Reply::new(code, lines)),
                LineStatus::Mismatch => return Err(Error::protocol(last)),
            }
        }
    }

    /// Accumulates chunks until the buffer ends in CRLF, then splits it.
    async fn wait_for_lines<S: LineSocket>(&self, socket: &mut S) -> Result<Vec<String>> {
        let deadline = Instant::now() + self.timeout;
        let mut buffer = BytesMut::new();

        while !buffer.ends_with(b"\r\n") {
            let chunk = timeout_at(deadline, socket.read())
                .await
                .map_err(|_| Error::Timeout(self.timeout))??;
            if chunk.is_empty() {
                tokio::task::yield_now().await;
                continue;
            }
            buffer.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&buffer);
        let lines: Vec<String> = text
            .trim_end_matches(['\r', '\n'])
            .split("\r\n")
            .map(str::to_string)
            .collect();
        for line in &lines {
            trace!(line = %line, "S:");
        }
        Ok(lines)
    }
}
