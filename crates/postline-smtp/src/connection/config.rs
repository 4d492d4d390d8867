//! Session configuration types.

use std::sync::Arc;
use std::time::Duration;

use postline_mime::{ContentTypeTable, DEFAULT_BOUNDARY};

use crate::auth::AuthPolicy;
use crate::compose::DotEscaping;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 25). **Not recommended for submission.**
    None,
    /// Start with plaintext, upgrade with STARTTLS during the handshake (port 587).
    #[default]
    StartTls,
    /// TLS from the start (port 465).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }
}

/// SMTP session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Domain announced in EHLO.
    pub domain: String,
    /// Security mode.
    pub security: Security,
    /// Name verified against the server certificate. Defaults to `host`.
    pub tls_server_name: Option<String>,
    /// TLS client configuration. Defaults to the webpki roots.
    pub tls_config: Option<Arc<rustls::ClientConfig>>,
    /// Re-issue EHLO after STARTTLS during the handshake.
    pub refresh_after_starttls: bool,
    /// How the authentication mechanism is chosen.
    pub auth_policy: AuthPolicy,
    /// How message body text is escaped.
    pub dot_escaping: DotEscaping,
    /// Attachment content types by file extension.
    pub content_types: ContentTypeTable,
    /// Multipart boundary.
    pub boundary: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Reply read timeout. `None` waits indefinitely.
    pub io_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with STARTTLS on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns the name used for certificate verification.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }
}

/// Builder for session configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    domain: String,
    security: Security,
    tls_server_name: Option<String>,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    refresh_after_starttls: bool,
    auth_policy: AuthPolicy,
    dot_escaping: DotEscaping,
    content_types: ContentTypeTable,
    boundary: String,
    connect_timeout: Duration,
    io_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            domain: "localhost".to_string(),
            security: Security::default(),
            tls_server_name: None,
            tls_config: None,
            refresh_after_starttls: false,
            auth_policy: AuthPolicy::default(),
            dot_escaping: DotEscaping::default(),
            content_types: ContentTypeTable::default(),
            boundary: DEFAULT_BOUNDARY.to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the domain announced in EHLO.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Overrides the name verified against the server certificate.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Sets the TLS client configuration.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Re-issues EHLO after the handshake's STARTTLS.
    #[must_use]
    pub const fn refresh_after_starttls(mut self, refresh: bool) -> Self {
        self.refresh_after_starttls = refresh;
        self
    }

    /// Sets the authentication policy.
    #[must_use]
    pub const fn auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    /// Sets the body escaping mode.
    #[must_use]
    pub const fn dot_escaping(mut self, escaping: DotEscaping) -> Self {
        self.dot_escaping = escaping;
        self
    }

    /// Replaces the attachment content-type table.
    #[must_use]
    pub fn content_types(mut self, table: ContentTypeTable) -> Self {
        self.content_types = table;
        self
    }

    /// Sets the multipart boundary.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reply read timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            host: self.host,
            domain: self.domain,
            security: self.security,
            tls_server_name: self.tls_server_name,
            tls_config: self.tls_config,
            refresh_after_starttls: self.refresh_after_starttls,
            auth_policy: self.auth_policy,
            dot_escaping: self.dot_escaping,
            content_types: self.content_types,
            boundary: self.boundary,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}
