//! SMTP command builder.

use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism, ReplyCode};
use std::fmt;

/// SMTP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client domain
        domain: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (SASL-IR), already base64-encoded
        initial_response: Option<String>,
    },
    /// Continuation line of a SASL exchange, already base64-encoded
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// Lone-dot line ending the message data
    EndOfData,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// VRFY - Verify a user or mailbox
    Vrfy {
        /// User or mailbox to verify
        argument: String,
    },
    /// EXPN - Expand a mailing list
    Expn {
        /// Mailing list to expand
        argument: String,
    },
    /// HELP - Ask for help, optionally on a topic
    Help {
        /// Topic
        topic: Option<String>,
    },
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Returns the command line without its CRLF terminator.
    #[must_use]
    pub fn line(&self) -> String {
        match self {
            Self::Ehlo { domain } => format!("EHLO {domain}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response,
            } => match initial_response {
                Some(resp) => format!("AUTH {mechanism} {resp}"),
                None => format!("AUTH {mechanism}"),
            },
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::EndOfData => ".".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Vrfy { argument } => format!("VRFY {argument}"),
            Self::Expn { argument } => format!("EXPN {argument}"),
            Self::Help { topic: None } => "HELP".to_string(),
            Self::Help { topic: Some(topic) } => format!("HELP {topic}"),
            Self::Quit => "QUIT".to_string(),
        }
    }

    /// Returns the command line ready for the wire, without its CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an argument contains CR or LF,
    /// which would put a second command on the wire.
    pub fn to_line(&self) -> Result<String> {
        let line = self.line();
        if line.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument(format!(
                "line break in {} argument",
                self.verb()
            )));
        }
        Ok(line)
    }

    /// Returns the reply code that signals success for this command.
    #[must_use]
    pub const fn expected_code(&self) -> ReplyCode {
        match self {
            Self::StartTls => ReplyCode::SERVICE_READY,
            Self::Auth {
                initial_response: None,
                ..
            } => ReplyCode::AUTH_CONTINUE,
            Self::Auth { .. } | Self::AuthResponse(_) => ReplyCode::AUTH_SUCCESS,
            Self::Data => ReplyCode::START_DATA,
            Self::Quit => ReplyCode::CLOSING,
            Self::Ehlo { .. }
            | Self::MailFrom { .. }
            | Self::RcptTo { .. }
            | Self::EndOfData
            | Self::Rset
            | Self::Noop
            | Self::Vrfy { .. }
            | Self::Expn { .. }
            | Self::Help { .. } => ReplyCode::OK,
        }
    }

    /// Returns the verb.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } | Self::AuthResponse(_) => "AUTH",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::EndOfData => ".",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Vrfy { .. } => "VRFY",
            Self::Expn { .. } => "EXPN",
            Self::Help { .. } => "HELP",
            Self::Quit => "QUIT",
        }
    }

    /// Returns a form of the command line that is safe to log.
    ///
    /// Credential payloads are replaced with `<redacted>`.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth {
                mechanism,
                initial_response: Some(_),
            } => format!("AUTH {mechanism} <redacted>"),
            Self::AuthResponse(_) => "<redacted>".to_string(),
            _ => self.line(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
