//! JSON form of an outgoing message.
//!
//! Address fields are objects mapping address to display name, in the
//! order they appear in the document:
//!
//! ```json
//! {
//!   "from": {"u@x": "Sender Name"},
//!   "to": {"r@x": ""},
//!   "subject": "Hello",
//!   "body": ["hello world"]
//! }
//! ```

use super::OutgoingMessage;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use sealpost_smtp::Mailbox;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Address → display name pairs in document order.
#[derive(Debug, Default)]
struct AddressMap(Vec<(String, String)>);

impl<'de> Deserialize<'de> for AddressMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AddressMapVisitor;

        impl<'de> Visitor<'de> for AddressMapVisitor {
            type Value = AddressMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping addresses to display names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<AddressMap, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((address, name)) = map.next_entry::<String, Option<String>>()? {
                    entries.push((address, name.unwrap_or_default()));
                }
                Ok(AddressMap(entries))
            }
        }

        deserializer.deserialize_map(AddressMapVisitor)
    }
}

impl AddressMap {
    fn into_mailboxes(self, field: &str) -> Result<Vec<Mailbox>> {
        self.0
            .into_iter()
            .map(|(address, name)| {
                Mailbox::with_name(name, address)
                    .map_err(|e| Error::Message(format!("{field}: {e}")))
            })
            .collect()
    }

    fn into_single(self, field: &str) -> Result<Option<Mailbox>> {
        let mut mailboxes = self.into_mailboxes(field)?;
        match mailboxes.len() {
            0 => Ok(None),
            1 => Ok(mailboxes.pop()),
            n => Err(Error::Message(format!(
                "{field} must hold exactly one address, found {n}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageDocument {
    from: AddressMap,
    #[serde(default)]
    sender: AddressMap,
    #[serde(default)]
    reply_to: AddressMap,
    #[serde(default)]
    read_receipt: AddressMap,
    #[serde(default)]
    return_path: AddressMap,
    #[serde(default)]
    to: AddressMap,
    #[serde(default)]
    cc: AddressMap,
    #[serde(default)]
    bcc: AddressMap,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    body: Vec<String>,
}

impl TryFrom<MessageDocument> for OutgoingMessage {
    type Error = Error;

    fn try_from(doc: MessageDocument) -> Result<Self> {
        let from = doc
            .from
            .into_single("from")?
            .ok_or_else(|| Error::Message("from must hold exactly one address, found 0".into()))?;

        Ok(Self {
            from,
            sender: doc.sender.into_single("sender")?,
            reply_to: doc.reply_to.into_single("reply_to")?,
            read_receipt: doc.read_receipt.into_single("read_receipt")?,
            return_path: doc.return_path.into_single("return_path")?,
            to: doc.to.into_mailboxes("to")?,
            cc: doc.cc.into_mailboxes("cc")?,
            bcc: doc.bcc.into_mailboxes("bcc")?,
            subject: doc.subject,
            date: doc.date,
            message_id: doc.message_id,
            body: doc.body,
        })
    }
}

impl OutgoingMessage {
    /// Parses the JSON form of a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, an address is invalid, or
    /// `from` does not hold exactly one address.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: MessageDocument = serde_json::from_str(json)?;
        doc.try_into()
    }

    /// Reads the JSON form of a message from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Message(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}
