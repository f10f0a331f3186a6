//! Header value encoding (RFC 2047 encoded-words, quoted display names).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sealpost_smtp::Mailbox;

/// Longest input slice placed in a single encoded-word. 45 bytes of UTF-8
/// become 60 base64 characters, keeping each word under 75 characters.
const MAX_WORD_INPUT: usize = 45;

/// Characters that force a display name to be quoted (RFC 5322 specials).
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

/// Encodes a header value using RFC 2047 `B` encoded-words when needed.
///
/// ASCII text is returned unchanged. Other text is split on character
/// boundaries into words of at most 45 input bytes each, separated by a
/// space.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (index, ch) in text.char_indices() {
        let next = index + ch.len_utf8();
        if next - start > MAX_WORD_INPUT {
            words.push(encoded_word(&text[start..end]));
            start = end;
        }
        end = next;
    }
    if start < text.len() {
        words.push(encoded_word(&text[start..]));
    }
    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

/// Replaces line breaks so a value cannot start a new header.
#[must_use]
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Formats a mailbox for a header: `addr`, or `Name <addr>`.
///
/// Non-ASCII names become encoded-words; names with specials are quoted.
#[must_use]
pub fn format_mailbox(mailbox: &Mailbox) -> String {
    let address = mailbox.address.as_str();
    let Some(name) = mailbox.name.as_deref().map(sanitize) else {
        return address.to_string();
    };
    if name.is_empty() || name == address {
        return address.to_string();
    }

    let display = if !name.is_ascii() {
        encode_rfc2047(&name)
    } else if name.contains(SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name
    };
    format!("{display} <{address}>")
}

/// Formats a list of mailboxes separated by `, `.
#[must_use]
pub fn format_mailbox_list(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(format_mailbox)
        .collect::<Vec<_>>()
        .join(", ")
}
