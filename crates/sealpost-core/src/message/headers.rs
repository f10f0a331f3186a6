//! Header block and envelope assembly.

use super::OutgoingMessage;
use super::encoding::{encode_rfc2047, format_mailbox, format_mailbox_list, sanitize};
use crate::error::{Error, Result};
use chrono::Local;
use sealpost_smtp::{Address, Mailbox};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Ordered `Name: value` header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Creates an empty block.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field. Empty values are dropped.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.fields.push((name.into(), value));
        }
    }

    /// Returns the first value of a field, matching the name case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates the fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for HeaderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("\r\n")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// The SMTP envelope: reverse path and forward paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// `MAIL FROM` address.
    pub from: Address,
    /// `RCPT TO` addresses, To then Cc then Bcc, duplicates kept.
    pub recipients: Vec<Address>,
}

/// A message split into what the session needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    /// Header block.
    pub headers: HeaderBlock,
    /// Envelope addresses.
    pub envelope: Envelope,
    /// Value of the `To` header; the key lookup target.
    pub recipient_identity: String,
    /// Body lines joined by CRLF.
    pub body: String,
}

/// Builds headers and envelopes from [`OutgoingMessage`]s.
#[derive(Debug, Clone)]
pub struct MessageEncoder {
    client_name: String,
}

impl MessageEncoder {
    /// Creates an encoder. `client_name` is the fallback domain for
    /// generated `Message-ID`s.
    #[must_use]
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    /// Encodes a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Message`] if the message has no envelope recipient.
    pub fn encode(&self, message: &OutgoingMessage) -> Result<EncodedMessage> {
        let recipients: Vec<Address> = message
            .envelope_recipients()
            .map(|m| m.address.clone())
            .collect();
        if recipients.is_empty() {
            return Err(Error::Message("no recipients".into()));
        }

        let to = format_mailbox_list(&message.to);
        let headers = self.header_block(message, &to);

        Ok(EncodedMessage {
            headers,
            envelope: Envelope {
                from: message.from.address.clone(),
                recipients,
            },
            recipient_identity: to,
            body: message.body_text(),
        })
    }

    fn header_block(&self, message: &OutgoingMessage, to: &str) -> HeaderBlock {
        let mut headers = HeaderBlock::new();
        let optional = |mailbox: Option<&Mailbox>| mailbox.map(format_mailbox).unwrap_or_default();

        headers.push("From", format_mailbox(&message.from));
        headers.push("Reply-To", optional(message.reply_to.as_ref()));
        headers.push(
            "Disposition-Notification-To",
            optional(message.read_receipt.as_ref()),
        );
        headers.push("Return-Path", optional(message.return_path.as_ref()));
        let sender = message
            .sender
            .as_ref()
            .filter(|s| s.address != message.from.address);
        headers.push("Sender", optional(sender));
        headers.push("To", to);
        headers.push("Cc", format_mailbox_list(&message.cc));
        headers.push("Date", Self::date(message));
        headers.push("Message-ID", self.message_id(message));
        headers.push("Subject", encode_rfc2047(&sanitize(&message.subject)));
        headers.push("MIME-Version", "1.0");
        headers.push("Content-Type", "text/plain; charset=utf-8");
        headers.push("Content-Transfer-Encoding", "8bit");
        headers
    }

    fn date(message: &OutgoingMessage) -> String {
        message.date.map_or_else(
            || Local::now().to_rfc2822(),
            |date| date.to_rfc2822(),
        )
    }

    fn message_id(&self, message: &OutgoingMessage) -> String {
        if let Some(id) = &message.message_id {
            return sanitize(id);
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let counter = MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let domain = message
            .from
            .address
            .domain()
            .unwrap_or(self.client_name.as_str());
        format!("<{nanos}.{}.{counter}@{domain}>", std::process::id())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn mb(addr: &str) -> Mailbox {
        Mailbox::new(addr).unwrap()
    }

    fn fixed(message: OutgoingMessage) -> OutgoingMessage {
        message
            .date(DateTime::parse_from_rfc3339("2012-07-10T12:00:00+02:00").unwrap())
            .message_id("<1@x>")
    }

    #[test]
    fn header_order_and_values() {
        let message = fixed(
            OutgoingMessage::new(Mailbox::with_name("U", "u@x").unwrap())
                .to(mb("r@x"))
                .cc(mb("c@x"))
                .bcc(mb("hidden@x"))
                .reply_to(mb("reply@x"))
                .subject("Hi"),
        );
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert_eq!(
            encoded.headers.to_string(),
            "From: U <u@x>\r\n\
             Reply-To: reply@x\r\n\
             To: r@x\r\n\
             Cc: c@x\r\n\
             Date: Tue, 10 Jul 2012 12:00:00 +0200\r\n\
             Message-ID: <1@x>\r\n\
             Subject: Hi\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit"
        );
        assert!(encoded.headers.get("bcc").is_none());
    }

    #[test]
    fn envelope_includes_bcc() {
        let message = OutgoingMessage::new(mb("from@x"))
            .to(mb("a@x"))
            .cc(mb("b@x"))
            .bcc(mb("c@x"));
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert_eq!(encoded.envelope.from.as_str(), "from@x");
        let rcpts: Vec<&str> = encoded.envelope.recipients.iter().map(Address::as_str).collect();
        assert_eq!(rcpts, vec!["a@x", "b@x", "c@x"]);
    }

    #[test]
    fn recipient_identity_is_to_header() {
        let message = OutgoingMessage::new(mb("u@x"))
            .to(Mailbox::with_name("R", "r@x").unwrap())
            .to(mb("s@x"))
            .cc(mb("c@x"));
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert_eq!(encoded.recipient_identity, "R <r@x>, s@x");
        assert_eq!(encoded.headers.get("To"), Some("R <r@x>, s@x"));
    }

    #[test]
    fn sender_equal_to_from_is_omitted() {
        let message = OutgoingMessage::new(mb("u@x"))
            .to(mb("r@x"))
            .sender(Mailbox::with_name("Other Name", "u@x").unwrap());
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert!(encoded.headers.get("Sender").is_none());

        let message = message.sender(mb("secretary@x"));
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert_eq!(encoded.headers.get("Sender"), Some("secretary@x"));
    }

    #[test]
    fn subject_is_sanitized_and_encoded() {
        let message = OutgoingMessage::new(mb("u@x"))
            .to(mb("r@x"))
            .subject("Grüße\r\nBcc: evil@x");
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        let subject = encoded.headers.get("Subject").unwrap();
        assert!(subject.starts_with("=?UTF-8?B?"));
        assert!(!encoded.headers.to_string().contains("Bcc"));
    }

    #[test]
    fn generated_message_ids_are_unique() {
        let message = OutgoingMessage::new(mb("u@example.org")).to(mb("r@x"));
        let encoder = MessageEncoder::new("localhost");
        let a = encoder.encode(&message).unwrap();
        let b = encoder.encode(&message).unwrap();
        let id = a.headers.get("Message-ID").unwrap();
        assert!(id.starts_with('<') && id.ends_with("@example.org>"));
        assert_ne!(id, b.headers.get("Message-ID").unwrap());
        assert!(a.headers.get("Date").is_some());
    }

    #[test]
    fn no_recipients_is_an_error() {
        let message = OutgoingMessage::new(mb("u@x"));
        let err = MessageEncoder::new("localhost").encode(&message).unwrap_err();
        assert!(matches!(err, Error::Message(_)));
    }

    #[test]
    fn body_joined_with_crlf() {
        let message = OutgoingMessage::new(mb("u@x"))
            .to(mb("r@x"))
            .line("hello")
            .line("world");
        let encoded = MessageEncoder::new("localhost").encode(&message).unwrap();
        assert_eq!(encoded.body, "hello\r\nworld");
    }
}
