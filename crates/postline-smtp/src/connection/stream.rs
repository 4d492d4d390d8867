//! Stream types for SMTP connections.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::error::{Error, Result};

/// A byte stream a session can run over and later switch to TLS.
///
/// [`SmtpStream`] is the production implementation; tests provide their own.
pub trait Upgrade: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Performs the client side of a TLS handshake over this stream.
    fn upgrade(
        self,
        connector: TlsConnector,
        server_name: ServerName<'static>,
    ) -> impl Future<Output = Result<Self>> + Send;

    /// Returns true if the stream is TLS-encrypted.
    fn is_tls(&self) -> bool;
}

/// A stream that can be either plaintext or TLS.
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Upgrade for SmtpStream {
    async fn upgrade(self, connector: TlsConnector, server_name: ServerName<'static>) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let tls = connector.connect(server_name, tcp).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::state("stream is already TLS")),
        }
    }

    fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl std::fmt::Debug for SmtpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(tcp) => f.debug_tuple("Plain").field(&tcp.peer_addr().ok()).finish(),
            Self::Tls(tls) => f
                .debug_tuple("Tls")
                .field(&tls.get_ref().0.peer_addr().ok())
                .finish(),
        }
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Creates a TLS connector.
///
/// Uses `config` when given, otherwise verifies against the webpki roots.
#[must_use]
pub fn create_tls_connector(config: Option<Arc<rustls::ClientConfig>>) -> TlsConnector {
    let config = config.unwrap_or_else(|| {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };

        Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        )
    });

    TlsConnector::from(config)
}

/// Validates a host name for use as the TLS server name.
///
/// # Errors
///
/// Returns [`Error::InvalidServerName`] if `name` is neither a DNS name nor an
/// IP address.
pub fn server_name(name: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(name.to_string()).map_err(|_| Error::InvalidServerName(name.to_string()))
}

/// Connects to a server without TLS.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if `timeout` elapses first, or [`Error::Io`] if
/// the connection fails.
pub async fn connect_plain(host: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let tcp = tcp_connect(host, port, timeout).await?;
    Ok(SmtpStream::Plain(tcp))
}

/// Connects to a server with TLS from the start.
///
/// # Errors
///
/// Returns an error if the connection or the TLS handshake fails, or if the
/// combined time exceeds `timeout`.
pub async fn connect_tls(
    host: &str,
    port: u16,
    connector: TlsConnector,
    server_name: ServerName<'static>,
    timeout: Duration,
) -> Result<SmtpStream> {
    let handshake = async {
        let tcp = TcpStream::connect((host, port)).await?;
        let tls = connector.connect(server_name, tcp).await?;
        Ok::<_, Error>(SmtpStream::Tls(Box::new(tls)))
    };

    tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| Error::Timeout)?
}

async fn tcp_connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let tcp = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| Error::Timeout)??;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}
