//! `sealpost` - send a PGP-signed email over SMTP
//!
//! Reads a JSON connection config and a JSON message, sends the message and
//! prints what went over the wire.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sealpost_core::{AnyTransport, ConnectionConfig, OutgoingMessage, SendResult, Transport};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Send a PGP-signed (and, when possible, encrypted) email over SMTP
#[derive(Parser, Debug)]
#[command(name = "sealpost")]
#[command(version, long_about = None)]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message
    Send {
        /// Connection config (defaults to <config dir>/sealpost/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Message file
        #[arg(short, long)]
        message: PathBuf,

        /// Host this send is made on behalf of; its name is used for
        /// EHLO/HELO when the config has no `client`
        #[arg(long)]
        request_host: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a config file and print it with secrets hidden
    CheckConfig {
        /// Connection config (defaults to <config dir>/sealpost/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("sealpost").join("config.json"))
        .context("no config directory on this platform; pass --config")
}

fn load_config(path: Option<PathBuf>) -> Result<ConnectionConfig> {
    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    debug!(path = %path.display(), "loading config");
    ConnectionConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

fn render(sent: &SendResult, json: bool) -> Result<String> {
    if json {
        let value = serde_json::json!({
            "headers": sent.headers,
            "message": sent.message,
            "body": sent.body,
            "mode": sent.mode.as_str(),
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    Ok(format!("{}\r\n\r\n{}", sent.headers, sent.body))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Send {
            config,
            message,
            request_host,
            json,
        } => {
            let config = load_config(config)?;
            let outgoing = OutgoingMessage::load(&message)
                .with_context(|| format!("loading {}", message.display()))?;
            let transport = AnyTransport::from_config(config, request_host.as_deref())?;

            let sent = transport.send(&outgoing).await.context("send failed")?;
            info!(mode = %sent.mode, "done");
            println!("{}", render(&sent, json)?);
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config)?;
            println!("{config:#?}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sealpost=debug,sealpost_core=debug,sealpost_smtp=debug"
    } else {
        "sealpost=info,sealpost_core=info,sealpost_smtp=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli).await
}
