//! Server replies and their codes.

use std::fmt;

/// A complete server reply.
///
/// `lines` keeps every line that arrived for the reply, continuation lines
/// included, with the code and separator still attached. The last one is
/// the line whose code was checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Code of the final line.
    pub code: ReplyCode,
    /// Raw lines, CRLF removed.
    pub lines: Vec<String>,
}

impl Reply {
    /// Builds a reply from its final code and raw lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The final raw line, or `""` for a reply with no lines.
    #[must_use]
    pub fn last_line(&self) -> &str {
        self.lines.last().map_or("", String::as_str)
    }

    /// Text of each line after its `NNN-`/`NNN ` prefix, newline separated.
    #[must_use]
    pub fn message_text(&self) -> String {
        let mut text = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(line.get(4..).unwrap_or_default());
        }
        text
    }

    /// 2yz.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// First digit of a reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2yz
    Completed,
    /// 3yz
    Intermediate,
    /// 4yz
    TransientFailure,
    /// 5yz
    PermanentFailure,
    /// Anything outside 200..=599.
    Other,
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Greeting.
    pub const SERVICE_READY: Self = Self(220);
    /// Reply to QUIT.
    pub const CLOSING: Self = Self(221);
    /// AUTH accepted.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// Generic completion.
    pub const OK: Self = Self(250);
    /// Server wants the next AUTH LOGIN value.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// Go ahead with the DATA payload.
    pub const START_DATA: Self = Self(354);
    /// Sent by servers that consider the session already authenticated.
    pub const BAD_SEQUENCE: Self = Self(503);

    /// Wraps a raw code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Parses the code at the start of a response line.
    ///
    /// The first three bytes must all be ASCII digits; whatever follows is
    /// not looked at.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        match line.as_bytes() {
            [a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
                let digit = |d: &u8| u16::from(d - b'0');
                Some(Self(digit(a) * 100 + digit(b) * 10 + digit(c)))
            }
            _ => None,
        }
    }

    /// The numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Which of the reply classes this code falls in.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completed,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::TransientFailure,
            5 => ReplyClass::PermanentFailure,
            _ => ReplyClass::Other,
        }
    }

    /// 2yz.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Completed)
    }

    /// 3yz.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        matches!(self.class(), ReplyClass::Intermediate)
    }

    /// 4yz.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::TransientFailure)
    }

    /// 5yz.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::PermanentFailure)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
