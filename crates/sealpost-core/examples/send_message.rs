#![allow(clippy::expect_used, clippy::doc_markdown)]
//! Example: send one message through the configured transport
//!
//! ```bash
//! export SEALPOST_CONFIG=~/.config/sealpost/config.json
//! export SEALPOST_TO=friend@example.com
//! cargo run --package sealpost-core --example send_message
//! ```
//!
//! With the default `smtp_pgp` transport the body is clear-signed with the
//! key of the configured username, or signed and encrypted if the keyring
//! holds a key for `SEALPOST_TO`.

use sealpost_core::{AnyTransport, ConnectionConfig, Mailbox, OutgoingMessage, Transport};

#[tokio::main]
async fn main() -> sealpost_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("sealpost_core=debug,sealpost_smtp=debug")
        .init();

    let config_path = std::env::var("SEALPOST_CONFIG").expect("SEALPOST_CONFIG not set");
    let to = std::env::var("SEALPOST_TO").expect("SEALPOST_TO not set");

    let config = ConnectionConfig::load(&config_path)?;
    let from = config
        .username
        .clone()
        .expect("config needs a username to send from");

    let message = OutgoingMessage::new(Mailbox::new(from)?)
        .to(Mailbox::new(to)?)
        .subject("sealpost example")
        .line("This message was signed before it left.")
        .line("")
        .line("Bye.");

    let transport = AnyTransport::from_config(config, None)?;
    let sent = transport.send(&message).await?;

    println!("--- {} ---", sent.mode);
    println!("{}\n\n{}", sent.headers, sent.body);
    Ok(())
}
