//! Command/response exchange.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::transport::LineTransport;
use crate::command::Command;
use crate::error::Result;
use crate::types::{Reply, ReplyCode};

/// Sends one command at a time and checks each reply.
#[derive(Debug)]
pub struct Engine<S> {
    transport: LineTransport<S>,
}

impl<S> Engine<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates an engine over a transport.
    pub const fn new(transport: LineTransport<S>) -> Self {
        Self { transport }
    }

    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`](crate::Error::UnexpectedReply) unless
    /// the greeting is 220.
    pub async fn read_greeting(&mut self) -> Result<Reply> {
        let reply = self.transport.read_reply().await?;
        debug!(code = %reply.code, "S: greeting");
        reply.expect(ReplyCode::SERVICE_READY)
    }

    /// Sends a command and requires its usual success code.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or
    /// [`Error::UnexpectedReply`](crate::Error::UnexpectedReply) if the code
    /// differs from [`Command::expected_code`].
    pub async fn send(&mut self, command: &Command) -> Result<Reply> {
        self.execute(command, command.expected_code()).await
    }

    /// Sends a command and requires `expected`.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::send`].
    pub async fn execute(&mut self, command: &Command, expected: ReplyCode) -> Result<Reply> {
        self.write_command(command).await?;
        self.read_expected(expected).await
    }

    /// Writes a command line, flushing any queued body lines before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument),
    /// before anything is written, if the command line would contain a line
    /// break; otherwise an error if the write fails.
    pub async fn write_command(&mut self, command: &Command) -> Result<()> {
        let line = command.to_line()?;
        debug!(command = %command.redacted(), "C:");
        self.transport.write_line(&line).await
    }

    /// Reads the next reply and requires `expected`.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::send`].
    pub async fn read_expected(&mut self, expected: ReplyCode) -> Result<Reply> {
        let reply = self.transport.read_reply().await?;
        debug!(code = %reply.code, "S:");
        reply.expect(expected)
    }

    /// Reads the next reply whatever its code.
    ///
    /// # Errors
    ///
    /// Returns a transport error only.
    pub async fn read_any(&mut self) -> Result<Reply> {
        let reply = self.transport.read_reply().await?;
        debug!(code = %reply.code, "S:");
        Ok(reply)
    }

    /// Returns the transport, for writing body lines.
    pub const fn transport_mut(&mut self) -> &mut LineTransport<S> {
        &mut self.transport
    }

    /// Returns the transport.
    pub const fn transport(&self) -> &LineTransport<S> {
        &self.transport
    }

    /// Returns the transport.
    pub fn into_transport(self) -> LineTransport<S> {
        self.transport
    }
}
