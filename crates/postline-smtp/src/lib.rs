//! # postline-smtp
//!
//! An outbound SMTP client engine (RFC 5321).
//!
//! ## Features
//!
//! - **Strict request/response**: every command waits for its complete reply
//!   and is checked against the one code that means success
//! - **TLS**: implicit TLS (port 465) and STARTTLS, verified against a
//!   configurable server name
//! - **Authentication**: PLAIN and CRAM-MD5
//! - **Composition**: `multipart/mixed` messages with a text body and file
//!   attachments, dot-stuffed on the way out
//!
//! ## Quick Start
//!
//! ```ignore
//! use postline_smtp::{Address, Attachment, Config, Credentials, Message, Session};
//!
//! #[tokio::main]
//! async fn main() -> postline_smtp::Result<()> {
//!     let config = Config::builder("smtp.example.com")
//!         .domain("client.example.com")
//!         .build();
//!
//!     // Greeting, EHLO, STARTTLS
//!     let mut session = Session::connect(config).await?;
//!     session.handshake().await?;
//!     session
//!         .authenticate(&Credentials::new("user@example.com", "password"))
//!         .await?;
//!
//!     let message = Message::new(
//!         Address::new("sender@example.com")?,
//!         Address::new("recipient@example.com")?,
//!         "Report",
//!         "See attached.",
//!     )
//!     .attach(Attachment::path("report.json"));
//!
//!     session.send(&message).await?;
//!     session.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── handshake() ──> Handshaked ── starttls() ──> TLS
//!                                  │
//!                                  └── authenticate() ──> Authenticated
//!
//! Idle ── MAIL ──> SenderSet ── RCPT ──> RecipientSet ── DATA ──> InData ── "." ──> Idle
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL payloads and mechanism selection
//! - [`command`]: SMTP command builders
//! - [`compose`]: Multipart message rendering and dot-stuffing
//! - [`connection`]: Streams, line transport and the session
//! - [`parser`]: Reply parser
//! - [`types`]: Addresses, capabilities and replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod compose;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use auth::{AuthPolicy, Credentials};
pub use compose::{Attachment, DotEscaping, Message};
pub use connection::{Config, ConfigBuilder, MailState, Security, Session, SmtpStream, Upgrade};
pub use error::{Error, Result};
pub use postline_mime::{ContentType, ContentTypeTable};
pub use types::{Address, AuthMechanism, Capabilities, Reply, ReplyCode};
