//! End-to-end sends over real TCP against a loopback SMTP server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sealpost_core::{
    ConnectionConfig, CryptoEngine, CryptoError, Error, Mailbox, OutgoingMessage, ProtectionMode,
    SigningIdentity, SmtpPgpTransport, SmtpTransport, Transport, TransportKind,
};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Engine that knows the keys it is given and records every call.
#[derive(Default)]
struct RecordingEngine {
    keys: Vec<&'static str>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl CryptoEngine for RecordingEngine {
    async fn key_exists(&self, recipient: &str) -> Result<bool, CryptoError> {
        self.calls.lock().unwrap().push(format!("key_exists {recipient}"));
        Ok(self.keys.iter().any(|k| *k == recipient))
    }

    async fn sign(&self, text: &str, signer: &SigningIdentity) -> Result<String, CryptoError> {
        self.calls.lock().unwrap().push(format!("sign {}", signer.user_id));
        Ok(format!(
            "-----BEGIN PGP SIGNED MESSAGE-----\r\n\r\n{text}\r\n-----BEGIN PGP SIGNATURE-----\r\nsig\r\n-----END PGP SIGNATURE-----"
        ))
    }

    async fn sign_and_encrypt(
        &self,
        _text: &str,
        signer: &SigningIdentity,
        recipient: &str,
    ) -> Result<String, CryptoError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("sign_and_encrypt {} {recipient}", signer.user_id));
        Ok("-----BEGIN PGP MESSAGE-----\r\n\r\nhQEMA\r\n-----END PGP MESSAGE-----".into())
    }
}

/// Accepts one connection and answers by script. Returns every line the
/// client sent.
async fn serve_once(rcpt_reply: &'static str) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let mut seen = Vec::new();
        let mut in_data = false;
        let mut auth = 0;

        writer.write_all(b"220 loopback ESMTP\r\n").await.unwrap();
        while let Ok(Some(line)) = lines.next_line().await {
            seen.push(line.clone());
            if in_data {
                if line == "." {
                    in_data = false;
                    writer.write_all(b"250 queued\r\n").await.unwrap();
                }
                continue;
            }
            let reply = if auth > 0 {
                auth -= 1;
                if auth == 1 { "334 UGFzc3dvcmQ6" } else { "235 ok" }
            } else if line.starts_with("EHLO") {
                "250-loopback\r\n250-SIZE 1000000\r\n250 AUTH LOGIN PLAIN"
            } else if line == "AUTH LOGIN" {
                auth = 2;
                "334 VXNlcm5hbWU6"
            } else if line.starts_with("RCPT") {
                rcpt_reply
            } else if line == "DATA" {
                in_data = true;
                "354 end with ."
            } else if line == "QUIT" {
                "221 bye"
            } else {
                "250 ok"
            };
            let _ = writer.write_all(format!("{reply}\r\n").as_bytes()).await;
            if line == "QUIT" {
                break;
            }
        }
        seen
    });
    (port, handle)
}

fn config(port: u16) -> ConnectionConfig {
    ConnectionConfig::from_json_str(&format!(
        r#"{{"host":"127.0.0.1","port":{port},"timeout":5,"username":"u","password":"p","pgppassword":"pp"}}"#
    ))
    .unwrap()
}

fn message() -> OutgoingMessage {
    OutgoingMessage::from_json_str(
        r#"{"from":{"u@x":""},"to":{"r@x":""},"subject":"hi","body":["hello world"]}"#,
    )
    .unwrap()
}

#[tokio::test]
async fn pgp_send_signs_for_unknown_recipient() {
    let (port, server) = serve_once("250 ok").await;
    let engine = RecordingEngine::default();
    let calls = Arc::clone(&engine.calls);
    let transport = SmtpPgpTransport::new(config(port), None, engine).unwrap();

    let sent = transport.send(&message()).await.unwrap();
    let seen = server.await.unwrap();

    assert_eq!(
        &seen[..7],
        [
            "EHLO localhost",
            "AUTH LOGIN",
            "dQ==",
            "cA==",
            "MAIL FROM:<u@x>",
            "RCPT TO:<r@x>",
            "DATA"
        ]
    );
    assert_eq!(&seen[seen.len() - 2..], [".", "QUIT"]);
    assert!(sent.headers.contains("\r\nTo: r@x\r\n"));
    assert_eq!(sent.mode, ProtectionMode::Signed);
    assert_eq!(sent.message, "hello world");
    assert_eq!(*calls.lock().unwrap(), ["key_exists r@x", "sign u"]);
}

#[tokio::test]
async fn pgp_send_encrypts_for_known_recipient() {
    let (port, server) = serve_once("250 ok").await;
    let engine = RecordingEngine {
        keys: vec!["r@x"],
        ..RecordingEngine::default()
    };
    let transport = SmtpPgpTransport::new(config(port), None, engine).unwrap();

    let sent = transport.send(&message()).await.unwrap();
    let seen = server.await.unwrap();

    assert_eq!(sent.mode, ProtectionMode::SignedAndEncrypted);
    assert!(seen.iter().any(|l| l == "hQEMA"));
    assert!(!seen.iter().any(|l| l.contains("hello world")));
}

#[tokio::test]
async fn rejected_recipient_aborts_and_quits() {
    let (port, server) = serve_once("550 5.1.1 unknown user").await;
    let transport = SmtpTransport::new(config(port).transport(TransportKind::Smtp), None);

    let err = transport.send(&message()).await.unwrap_err();
    let seen = server.await.unwrap();

    assert!(matches!(err, Error::Smtp(_)));
    assert!(err.to_string().contains("550 5.1.1 unknown user"));
    assert_eq!(seen.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport = SmtpTransport::new(config(port), None);
    let message = OutgoingMessage::new(Mailbox::new("u@x").unwrap()).to(Mailbox::new("r@x").unwrap());
    let err = transport.send(&message).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Smtp(sealpost_smtp::Error::Connection { .. })
    ));
    assert!(err.is_transient());
}
