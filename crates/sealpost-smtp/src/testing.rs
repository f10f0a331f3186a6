//! In-memory socket for unit tests.

use crate::connection::LineSocket;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// Hands out scripted chunks and records everything written.
///
/// Once the script runs dry, `read` never completes, so a deadline is the
/// only way out.
#[derive(Debug, Default)]
pub struct ScriptedSocket {
    chunks: VecDeque<(Duration, Vec<u8>)>,
    written: Vec<u8>,
    refuse_connect: bool,
    connected: bool,
    disconnects: usize,
}

impl ScriptedSocket {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks
                .iter()
                .map(|c| (Duration::ZERO, c.as_bytes().to_vec()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// Queues a chunk delivered `delay` after it is asked for.
    pub fn push_delayed(&mut self, delay: Duration, chunk: &str) {
        self.chunks.push_back((delay, chunk.as_bytes().to_vec()));
    }

    pub fn remaining_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    /// Written data split into CRLF-terminated commands.
    pub fn commands(&self) -> Vec<String> {
        self.written()
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }

    pub const fn disconnects(&self) -> usize {
        self.disconnects
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }
}

impl LineSocket for ScriptedSocket {
    async fn connect(&mut self) -> Result<()> {
        if self.refuse_connect {
            return Err(Error::Connection {
                host: "scripted".into(),
                port: 25,
                reason: "connection refused".into(),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        match self.chunks.pop_front() {
            Some((delay, chunk)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            }
            None => std::future::pending().await,
        }
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.disconnects += 1;
    }
}
