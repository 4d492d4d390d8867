//! SMTP reply types.

use crate::error::{Error, Result};
use std::fmt;

/// SMTP reply from server.
///
/// A reply spans one or more lines; every line but the last carries the
/// continuation marker (`250-...`), the last one does not (`250 ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Text of each reply line, without code and separator.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message, lines joined with `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Returns the first line of the message, or an empty string.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.message.first().map_or("", String::as_str)
    }

    /// Checks the reply code against the one a command requires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] carrying both codes and the reply
    /// text when they differ.
    pub fn expect(self, expected: ReplyCode) -> Result<Self> {
        if self.code == expected {
            Ok(self)
        } else {
            Err(Error::unexpected(self.code, expected, self.message_text()))
        }
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Parses the three-digit prefix of a reply line.
    ///
    /// Only ASCII digits are accepted, and the code must be at least 100.
    /// Whether a code is acceptable for a command is decided by
    /// [`Reply::expect`], not here.
    #[must_use]
    pub fn parse(digits: &[u8]) -> Option<Self> {
        match digits {
            [a @ b'1'..=b'9', b, c] if b.is_ascii_digit() && c.is_ascii_digit() => Some(Self(
                u16::from(a - b'0') * 100 + u16::from(b - b'0') * 10 + u16::from(c - b'0'),
            )),
            _ => None,
        }
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Codes the client expects
impl ReplyCode {
    /// 214 Help message
    pub const HELP: Self = Self(214);
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 252 Cannot verify user, but will accept message
    pub const CANNOT_VERIFY: Self = Self(252);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 454 TLS not available due to temporary reason
    pub const TLS_UNAVAILABLE: Self = Self(454);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 503 Bad sequence of commands
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 554 Transaction failed
    pub const TRANSACTION_FAILED: Self = Self(554);
}
