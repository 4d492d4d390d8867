//! SMTP connection management.
//!
//! Layers, bottom-up:
//! - [`SmtpStream`]: plaintext or TLS byte stream
//! - [`LineTransport`]: CRLF line framing and reply reading
//! - [`Engine`]: one command, one checked reply
//! - [`Session`]: handshake, TLS, authentication and mail transactions

mod config;
mod engine;
mod session;
mod stream;
mod transaction;
mod transport;

pub use config::{Config, ConfigBuilder, Security};
pub use engine::Engine;
pub use session::Session;
pub use stream::{
    SmtpStream, Upgrade, connect_plain, connect_tls, create_tls_connector, server_name,
};
pub use transaction::{MailState, MailStep};
pub use transport::LineTransport;
