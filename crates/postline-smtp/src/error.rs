//! Error types for SMTP operations.

use crate::types::ReplyCode;
use std::io;
use std::path::PathBuf;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The name presented for certificate verification is not a valid server name.
    #[error("Invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// A reply line could not be parsed.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// Connecting or reading did not finish within the configured timeout.
    #[error("Operation timed out")]
    Timeout,

    /// Server answered with a code other than the one the command requires.
    #[error("Unexpected reply {got} (expected {expected}): {message}")]
    UnexpectedReply {
        /// Code received.
        got: ReplyCode,
        /// Code the command required.
        expected: ReplyCode,
        /// Reply text.
        message: String,
    },

    /// Operation is not allowed in the current session state.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// Credentials could not be prepared (challenge decoding, digest, mechanism choice).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Server rejected the authentication exchange.
    #[error("Authentication rejected {code}: {message}")]
    AuthRejected {
        /// Code received.
        code: ReplyCode,
        /// Reply text.
        message: String,
    },

    /// A command argument cannot be sent as given.
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// An attachment could not be read.
    #[error("Cannot read attachment {}: {source}", .path.display())]
    Attachment {
        /// Attachment path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

impl Error {
    /// Creates an unexpected-reply error.
    #[must_use]
    pub fn unexpected(got: ReplyCode, expected: ReplyCode, message: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            got,
            expected,
            message: message.into(),
        }
    }

    /// Creates an invalid-state error.
    #[must_use]
    pub fn state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    /// Returns the server reply code carried by this error, if any.
    #[must_use]
    pub const fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::UnexpectedReply { got, .. } => Some(*got),
            Self::AuthRejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the failure happened on the stream itself.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::InvalidServerName(_)
                | Self::MalformedReply(_)
                | Self::Timeout
        )
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self.reply_code() {
            Some(code) => code.is_permanent(),
            None => false,
        }
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self.reply_code() {
            Some(code) => code.is_transient(),
            None => false,
        }
    }
}
