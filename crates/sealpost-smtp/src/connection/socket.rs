//! Byte-stream sockets the session talks through.

use super::Security;
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};
use tracing::debug;

const READ_CHUNK: usize = 1024;

/// Connect/read/write/disconnect abstraction over a byte stream.
///
/// `read` returns whatever bytes are currently available; a chunk may hold
/// part of a line, several lines, or nothing at all.
pub trait LineSocket: Send {
    /// Opens the connection.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Writes all of `data`.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Reads the next available chunk.
    fn read(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Closes the connection. Never fails; closing twice is a no-op.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}

/// Plain or TLS-wrapped TCP stream.
#[derive(Debug)]
enum SmtpStream {
    Tcp(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// TCP socket to an SMTP server, optionally with implicit TLS.
#[derive(Debug)]
pub struct TcpSocket {
    host: String,
    port: u16,
    timeout: Duration,
    security: Security,
    stream: Option<SmtpStream>,
}

impl TcpSocket {
    /// Creates an unconnected socket. `timeout` bounds the connect.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration, security: Security) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            security,
            stream: None,
        }
    }

    /// Returns true while a stream is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connection_error(&self, reason: impl ToString) -> Error {
        Error::Connection {
            host: self.host.clone(),
            port: self.port,
            reason: reason.to_string(),
        }
    }

    async fn open(&self) -> Result<SmtpStream> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| self.connection_error(e))?;

        match self.security {
            Security::None => Ok(SmtpStream::Tcp(tcp)),
            Security::Tls => {
                let server_name = ServerName::try_from(self.host.clone())
                    .map_err(|_| self.connection_error(format!("invalid hostname: {}", self.host)))?;
                let tls = create_tls_connector()
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| self.connection_error(e))?;
                Ok(SmtpStream::Tls(Box::new(tls)))
            }
        }
    }

    fn stream_mut(&mut self) -> Result<&mut SmtpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::InvalidState("socket is not connected".into()))
    }
}

impl LineSocket for TcpSocket {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        debug!(host = %self.host, port = self.port, security = ?self.security, "connecting");
        let stream = tokio::time::timeout(self.timeout, self.open())
            .await
            .map_err(|_| self.connection_error(format!("connect timed out after {:?}", self.timeout)))??;
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.stream_mut()? {
            SmtpStream::Tcp(stream) => write_flush(stream, data).await,
            SmtpStream::Tls(stream) => write_flush(stream.as_mut(), data).await,
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        match self.stream_mut()? {
            SmtpStream::Tcp(stream) => read_chunk(stream).await,
            SmtpStream::Tls(stream) => read_chunk(stream.as_mut()).await,
        }
    }

    async fn disconnect(&mut self) {
        let result = match self.stream.take() {
            Some(SmtpStream::Tcp(mut stream)) => stream.shutdown().await,
            Some(SmtpStream::Tls(mut stream)) => stream.shutdown().await,
            None => return,
        };
        if let Err(e) = result {
            debug!(error = %e, "shutdown failed while disconnecting");
        }
    }
}

/// Socket over an already established stream.
///
/// `connect` only checks that the stream is still present.
#[derive(Debug)]
pub struct StreamSocket<T> {
    stream: Option<T>,
}

impl<T> StreamSocket<T> {
    /// Wraps a connected stream.
    #[must_use]
    pub const fn new(stream: T) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Returns the wrapped stream unless it was disconnected.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.stream
    }

    fn stream_mut(&mut self) -> Result<&mut T> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::InvalidState("socket is not connected".into()))
    }
}

impl<T> LineSocket for StreamSocket<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn connect(&mut self) -> Result<()> {
        self.stream_mut().map(|_| ())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        write_flush(self.stream_mut()?, data).await
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        read_chunk(self.stream_mut()?).await
    }

    async fn disconnect(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "shutdown failed while disconnecting");
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; READ_CHUNK];
    let n = reader.read(&mut buf).await?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        )
        .into());
    }
    buf.truncate(n);
    Ok(buf)
}

/// Creates a TLS connector with the bundled web PKI roots.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
