//! Test streams standing in for a server connection.

#![allow(dead_code, clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use postline_smtp::{Config, Error, Result, Security, Session, Upgrade};
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::TlsConnector;
use tokio_test::io::{Builder, Mock};

/// Plaintext configuration for `mx.example.com`.
pub fn plain_config() -> Config {
    Config::builder("mx.example.com")
        .security(Security::None)
        .build()
}

/// Scripted conversation: every read and write must happen in order.
///
/// `upgrade` flips the stream to "TLS" without a real handshake.
pub struct Scripted {
    inner: Mock,
    tls: bool,
    fail_upgrade: bool,
}

impl Scripted {
    pub fn new(builder: &mut Builder) -> Self {
        Self {
            inner: builder.build(),
            tls: false,
            fail_upgrade: false,
        }
    }

    /// Makes the TLS handshake fail.
    pub fn failing_upgrade(mut self) -> Self {
        self.fail_upgrade = true;
        self
    }

    /// Starts out as an implicit-TLS stream.
    pub fn already_tls(mut self) -> Self {
        self.tls = true;
        self
    }
}

impl Upgrade for Scripted {
    async fn upgrade(mut self, _connector: TlsConnector, _name: ServerName<'static>) -> Result<Self> {
        if self.fail_upgrade {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "handshake failed",
            )));
        }
        self.tls = true;
        Ok(self)
    }

    fn is_tls(&self) -> bool {
        self.tls
    }
}

impl AsyncRead for Scripted {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Scripted {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Mock stream that returns predefined responses and records what the
/// client sends.
pub struct Capture {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured bytes sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

/// Returns everything sent so far as text.
pub fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&sent.lock().unwrap()).into_owned()
}

/// Opens a plaintext session over a capture stream and completes EHLO.
pub async fn capture_session(
    responses: &[u8],
    config: Config,
) -> (Session<Capture>, Arc<Mutex<Vec<u8>>>) {
    let (stream, sent) = Capture::new(responses);
    let mut session = Session::from_stream(stream, config).await.unwrap();
    session.handshake().await.unwrap();
    (session, sent)
}

impl Upgrade for Capture {
    async fn upgrade(self, _connector: TlsConnector, _name: ServerName<'static>) -> Result<Self> {
        Err(Error::state("capture streams cannot negotiate TLS"))
    }

    fn is_tls(&self) -> bool {
        false
    }
}

impl AsyncRead for Capture {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for Capture {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
