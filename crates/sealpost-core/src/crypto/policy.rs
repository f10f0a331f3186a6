//! Sign-or-encrypt policy.

use super::{CryptoEngine, CryptoError, SigningIdentity};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Column the body is wrapped at before signing.
pub const WRAP_WIDTH: usize = 70;

/// Wraps `text` at `width` columns.
///
/// Existing line breaks are kept, trailing ones included. Words longer
/// than `width` are left whole and lines are joined with CRLF.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> String {
    let options = textwrap::Options::new(width)
        .break_words(false)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
        .word_splitter(textwrap::WordSplitter::NoHyphenation);
    let mut out: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.len() <= width {
            out.push(line.to_string());
        } else {
            out.extend(textwrap::wrap(line, &options).into_iter().map(Cow::into_owned));
        }
    }
    out.join("\r\n")
}

/// How a body was protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionMode {
    /// Body sent as given.
    Plain,
    /// Clear-signed; readable.
    Signed,
    /// Signed and encrypted for the recipient.
    SignedAndEncrypted,
}

impl ProtectionMode {
    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Signed => "signed",
            Self::SignedAndEncrypted => "signed+encrypted",
        }
    }
}

impl fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`PgpPolicy::protect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedBody {
    /// What was applied.
    pub mode: ProtectionMode,
    /// The wrapped plaintext the signature covers.
    pub wrapped: String,
    /// The body to transmit.
    pub body: String,
}

/// Always signs; encrypts too when the recipient has a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgpPolicy {
    width: usize,
}

impl Default for PgpPolicy {
    fn default() -> Self {
        Self { width: WRAP_WIDTH }
    }
}

impl PgpPolicy {
    /// Creates a policy wrapping at `width` columns.
    #[must_use]
    pub const fn with_width(width: usize) -> Self {
        Self { width }
    }

    /// Wraps `plaintext`, then clear-signs it or, if `recipient` has a
    /// public key, signs and encrypts it.
    ///
    /// # Errors
    ///
    /// Propagates any engine failure.
    pub async fn protect<E: CryptoEngine>(
        &self,
        engine: &E,
        plaintext: &str,
        signer: &SigningIdentity,
        recipient: &str,
    ) -> Result<ProtectedBody, CryptoError> {
        let wrapped = wrap_text(plaintext, self.width);
        let (mode, body) = if engine.key_exists(recipient).await? {
            let body = engine.sign_and_encrypt(&wrapped, signer, recipient).await?;
            (ProtectionMode::SignedAndEncrypted, body)
        } else {
            (ProtectionMode::Signed, engine.sign(&wrapped, signer).await?)
        };
        debug!(%mode, recipient, "body protected");
        Ok(ProtectedBody {
            mode,
            wrapped,
            body,
        })
    }
}
