//! Outgoing message model and its wire encoding.

mod document;
mod encoding;
mod headers;

pub use encoding::{encode_rfc2047, format_mailbox, format_mailbox_list};
pub use headers::{EncodedMessage, Envelope, HeaderBlock, MessageEncoder};

use chrono::{DateTime, FixedOffset};
use sealpost_smtp::Mailbox;

/// An email ready to be sent.
///
/// Exactly one `from` mailbox. Header-only mailboxes (`sender`, `reply_to`,
/// `read_receipt`, `return_path`) never reach the envelope; `to`, `cc` and
/// `bcc` all do, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Author.
    pub from: Mailbox,
    /// Actual sender, when different from the author.
    pub sender: Option<Mailbox>,
    /// Reply address.
    pub reply_to: Option<Mailbox>,
    /// Where read receipts go (`Disposition-Notification-To`).
    pub read_receipt: Option<Mailbox>,
    /// Bounce address header.
    pub return_path: Option<Mailbox>,
    /// Primary recipients. Only these are considered for encryption.
    pub to: Vec<Mailbox>,
    /// Carbon-copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind carbon-copy recipients; never written to headers.
    pub bcc: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// Fixed `Date` header; the current time when absent.
    pub date: Option<DateTime<FixedOffset>>,
    /// Fixed `Message-ID` header; generated when absent.
    pub message_id: Option<String>,
    /// Plain text body, one entry per line.
    pub body: Vec<String>,
}

impl OutgoingMessage {
    /// Creates a message with only an author.
    #[must_use]
    pub const fn new(from: Mailbox) -> Self {
        Self {
            from,
            sender: None,
            reply_to: None,
            read_receipt: None,
            return_path: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            date: None,
            message_id: None,
            body: Vec::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: Mailbox) -> Self {
        self.to.push(recipient);
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: Mailbox) -> Self {
        self.cc.push(recipient);
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: Mailbox) -> Self {
        self.bcc.push(recipient);
        self
    }

    /// Sets the `Sender` header.
    #[must_use]
    pub fn sender(mut self, sender: Mailbox) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the `Reply-To` header.
    #[must_use]
    pub fn reply_to(mut self, reply_to: Mailbox) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Requests a read receipt to the given mailbox.
    #[must_use]
    pub fn read_receipt(mut self, mailbox: Mailbox) -> Self {
        self.read_receipt = Some(mailbox);
        self
    }

    /// Sets the `Return-Path` header.
    #[must_use]
    pub fn return_path(mut self, mailbox: Mailbox) -> Self {
        self.return_path = Some(mailbox);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Fixes the `Date` header.
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Fixes the `Message-ID` header.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Appends a body line.
    #[must_use]
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.body.push(line.into());
        self
    }

    /// Returns the body lines joined with CRLF.
    #[must_use]
    pub fn body_text(&self) -> String {
        self.body.join("\r\n")
    }

    /// Returns every envelope recipient: To, then Cc, then Bcc.
    ///
    /// Duplicates across (or within) the lists are kept.
    pub fn envelope_recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}
