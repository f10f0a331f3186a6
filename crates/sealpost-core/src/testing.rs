//! Test doubles.

use crate::crypto::{CryptoEngine, CryptoError, SigningIdentity};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sealpost_smtp::StreamSocket;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// In-memory engine with a fixed set of known keys.
///
/// "Signing" wraps the text in clear-sign armor; "encryption" base64
/// encodes it inside message armor. Every call is recorded.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    keys: Vec<String>,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, recipient: &str) -> Self {
        self.keys.push(recipient.to_string());
        self
    }

    pub const fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check(&self, operation: &'static str) -> Result<(), CryptoError> {
        if self.fail {
            Err(CryptoError::Engine {
                operation,
                status: "exit status: 2".into(),
                stderr: "bad passphrase".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl CryptoEngine for FakeEngine {
    async fn key_exists(&self, recipient: &str) -> Result<bool, CryptoError> {
        self.record(format!("key_exists {recipient}"));
        Ok(self.keys.iter().any(|k| k == recipient))
    }

    async fn sign(&self, text: &str, signer: &SigningIdentity) -> Result<String, CryptoError> {
        self.record(format!("sign {}", signer.user_id));
        self.check("sign")?;
        Ok(format!(
            "-----BEGIN PGP SIGNED MESSAGE-----\r\nHash: SHA256\r\n\r\n{text}\r\n\
             -----BEGIN PGP SIGNATURE-----\r\n\r\nsig-by-{}\r\n-----END PGP SIGNATURE-----",
            signer.user_id
        ))
    }

    async fn sign_and_encrypt(
        &self,
        text: &str,
        signer: &SigningIdentity,
        recipient: &str,
    ) -> Result<String, CryptoError> {
        self.record(format!("sign_and_encrypt {} {recipient}", signer.user_id));
        self.check("sign+encrypt")?;
        Ok(format!(
            "-----BEGIN PGP MESSAGE-----\r\n\r\n{}\r\n-----END PGP MESSAGE-----",
            STANDARD.encode(text)
        ))
    }
}

/// Scripted SMTP server on the far end of an in-memory duplex pipe.
///
/// Answers every command with a sensible default unless an override
/// matches the start of the line. The join handle yields every line the
/// client sent.
#[derive(Debug, Default)]
pub struct FakeServer {
    overrides: Vec<(&'static str, &'static str)>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers lines starting with `prefix` with `reply` instead.
    pub fn reply(mut self, prefix: &'static str, reply: &'static str) -> Self {
        self.overrides.push((prefix, reply));
        self
    }

    pub fn spawn(self) -> (StreamSocket<DuplexStream>, JoinHandle<Vec<String>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handle = tokio::spawn(self.serve(server));
        (StreamSocket::new(client), handle)
    }

    async fn serve(self, stream: DuplexStream) -> Vec<String> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        let mut seen = Vec::new();
        let mut auth_steps = 0;
        let mut in_data = false;

        // the client may already be gone; write errors are ignored throughout
        let _ = writer.write_all(b"220 fake.example ESMTP\r\n").await;

        while let Ok(Some(line)) = lines.next_line().await {
            seen.push(line.clone());
            if in_data {
                if line == "." {
                    in_data = false;
                    let _ = writer.write_all(b"250 2.0.0 queued\r\n").await;
                }
                continue;
            }

            let overridden = self
                .overrides
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix))
                .map(|(_, reply)| *reply);
            let reply = overridden.unwrap_or_else(|| {
                if auth_steps == 2 {
                    "334 UGFzc3dvcmQ6"
                } else if auth_steps == 1 {
                    "235 2.7.0 accepted"
                } else if line.starts_with("EHLO") {
                    "250-fake.example\r\n250 AUTH LOGIN"
                } else if line.starts_with("AUTH LOGIN") {
                    "334 VXNlcm5hbWU6"
                } else if line.starts_with("DATA") {
                    "354 go ahead"
                } else if line.starts_with("QUIT") {
                    "221 bye"
                } else if line.starts_with("HELO")
                    || line.starts_with("MAIL")
                    || line.starts_with("RCPT")
                {
                    "250 ok"
                } else {
                    "500 unrecognized"
                }
            });

            if auth_steps > 0 {
                auth_steps -= 1;
            } else if line.starts_with("AUTH LOGIN") && reply.starts_with("334") {
                auth_steps = 2;
            }
            if line.starts_with("DATA") && reply.starts_with("354") {
                in_data = true;
            }

            let _ = writer.write_all(format!("{reply}\r\n").as_bytes()).await;
            if line.starts_with("QUIT") {
                break;
            }
        }
        seen
    }
}
