//! Line-framed I/O for the SMTP protocol.
//!
//! SMTP exchanges CRLF-terminated lines. Commands are written and flushed one
//! at a time; message body lines are buffered and flushed together with the
//! end-of-data line.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::Reply;

/// Default buffer size for reading and writing.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum reply line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Buffered body bytes are pushed to the stream once they exceed this size.
const BODY_FLUSH_THRESHOLD: usize = 64 * 1024;

/// Protocol-framed transport over a byte stream.
pub struct LineTransport<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    io_timeout: Option<Duration>,
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a transport over a stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            io_timeout: None,
        }
    }

    /// Bounds every reply read by `timeout`. `None` waits indefinitely.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Reads one complete reply (continuation lines plus the final line).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on stream failure or EOF, [`Error::Timeout`] if the
    /// configured timeout elapses, and [`Error::MalformedReply`] if a line is
    /// not a valid reply line.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_reply_lines())
                .await
                .map_err(|_| Error::Timeout)?,
            None => self.read_reply_lines().await,
        }
    }

    async fn read_reply_lines(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }

    /// Reads a single line, without its terminator.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::MalformedReply("line too long".to_string()));
            }
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Writes a line followed by CRLF and flushes it, together with any
    /// buffered body lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_buffer.extend_from_slice(line.as_bytes());
        self.write_buffer.extend_from_slice(b"\r\n");
        self.flush().await
    }

    /// Queues a body line followed by CRLF.
    ///
    /// The bytes are written as-is; escaping is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if pushing a full buffer to the stream fails.
    pub async fn write_body_line(&mut self, line: &[u8]) -> Result<()> {
        self.write_buffer.extend_from_slice(line);
        self.write_buffer.extend_from_slice(b"\r\n");

        if self.write_buffer.len() >= BODY_FLUSH_THRESHOLD {
            let stream = self.reader.get_mut();
            stream.write_all(&self.write_buffer).await?;
            self.write_buffer.clear();
        }
        Ok(())
    }

    /// Writes out everything buffered and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn flush(&mut self) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        self.write_buffer.clear();
        Ok(())
    }

    /// Returns true if bytes were received that no reply has consumed yet.
    #[must_use]
    pub fn has_pending_input(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Shuts down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Returns the underlying stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if unread input or unwritten output is
    /// buffered, since it would be lost (or, across a TLS upgrade, trusted).
    pub fn into_inner(self) -> Result<S> {
        if self.has_pending_input() {
            return Err(Error::state("unread data buffered on the transport"));
        }
        if !self.write_buffer.is_empty() {
            return Err(Error::state("unwritten data buffered on the transport"));
        }
        Ok(self.reader.into_inner())
    }
}

impl<S> std::fmt::Debug for LineTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTransport")
            .field("write_buffered", &self.write_buffer.len())
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}
