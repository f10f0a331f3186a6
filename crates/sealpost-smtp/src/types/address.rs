//! Envelope addresses and display mailboxes.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An address as it goes between the angle brackets of `MAIL FROM` and
/// `RCPT TO`.
///
/// The check is about shape only. Anything that could break out of the
/// `<...>` framing or split the command line is refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Checks and wraps `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] when `addr` is empty, holds whitespace,
    /// control characters or angle brackets, or lacks a non-empty local part
    /// and domain around its last `@`.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        match shape_problem(&addr) {
            Some(problem) => Err(Error::InvalidAddress(format!("{addr:?}: {problem}"))),
            None => Ok(Self(addr)),
        }
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything after the last `@`.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.0.rsplit_once('@').map(|(_, domain)| domain)
    }
}

fn shape_problem(addr: &str) -> Option<&'static str> {
    if addr.is_empty() {
        return Some("empty");
    }
    if addr
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || matches!(c, '<' | '>'))
    {
        return Some("whitespace, control characters and angle brackets are not allowed");
    }
    match addr.rsplit_once('@') {
        None => Some("no @"),
        Some(("", _)) => Some("empty local part"),
        Some((_, "")) => Some("empty domain"),
        Some(_) => None,
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// An address plus the display name shown in headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// `None` when there is nothing to show.
    pub name: Option<String>,
    /// Where mail goes.
    pub address: Address,
}

impl Mailbox {
    /// A mailbox with no display name.
    ///
    /// # Errors
    ///
    /// See [`Address::new`].
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Address::new(address).map(|address| Self {
            name: None,
            address,
        })
    }

    /// A mailbox with a display name. An empty `name` counts as none.
    ///
    /// # Errors
    ///
    /// See [`Address::new`].
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let mut mailbox = Self::new(address)?;
        mailbox.name = Some(name.into()).filter(|n| !n.is_empty());
        Ok(mailbox)
    }
}
