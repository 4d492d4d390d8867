//! Job file: where to connect and what to send.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use postline_smtp::{
    Address, Attachment, AuthPolicy, Config, ContentType, ContentTypeTable, Credentials,
    DotEscaping, Message, Security,
};
use serde::Deserialize;

/// Environment variable holding the SMTP password.
pub const PASSWORD_VAR: &str = "POSTLINE_PASSWORD";

/// One submission, as read from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub host: String,
    pub port: Option<u16>,
    #[serde(default)]
    pub security: SecurityMode,
    pub domain: Option<String>,
    pub tls_server_name: Option<String>,
    #[serde(default)]
    pub refresh_after_starttls: bool,
    #[serde(default)]
    pub auth_policy: PolicyMode,
    #[serde(default)]
    pub dot_escaping: EscapingMode,
    pub connect_timeout_secs: Option<u64>,
    pub io_timeout_secs: Option<u64>,
    /// Extra attachment types by extension, e.g. `"csv": "text/csv"`.
    #[serde(default)]
    pub content_types: BTreeMap<String, String>,
    /// Authenticate as this user; the password comes from [`PASSWORD_VAR`].
    pub username: Option<String>,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
    /// Add a `Date` header with the local time.
    #[serde(default)]
    pub date: bool,
    /// Issue NOOP after the handshake.
    #[serde(default)]
    pub noop: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    None,
    #[default]
    StartTls,
    Implicit,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    #[default]
    TlsDriven,
    Negotiated,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscapingMode {
    #[default]
    LineLeading,
    Coarse,
}

impl Job {
    /// Reads and parses a job file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse job file {}", path.display()))
    }

    /// Builds the session configuration.
    pub fn config(&self) -> Result<Config> {
        let security = match self.security {
            SecurityMode::None => Security::None,
            SecurityMode::StartTls => Security::StartTls,
            SecurityMode::Implicit => Security::Implicit,
        };
        let mut builder = Config::builder(&self.host)
            .security(security)
            .refresh_after_starttls(self.refresh_after_starttls)
            .auth_policy(match self.auth_policy {
                PolicyMode::TlsDriven => AuthPolicy::TlsDriven,
                PolicyMode::Negotiated => AuthPolicy::CapabilityNegotiated,
            })
            .dot_escaping(match self.dot_escaping {
                EscapingMode::LineLeading => DotEscaping::LineLeading,
                EscapingMode::Coarse => DotEscaping::Coarse,
            });

        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain);
        }
        if let Some(name) = &self.tls_server_name {
            builder = builder.tls_server_name(name);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.io_timeout_secs {
            builder = builder.io_timeout(Duration::from_secs(secs));
        }
        Ok(builder.content_types(self.content_types()?).build())
    }

    fn content_types(&self) -> Result<ContentTypeTable> {
        let mut table = ContentTypeTable::default();
        for (extension, content_type) in &self.content_types {
            let content_type = ContentType::parse(content_type)
                .with_context(|| format!("Invalid content type for {extension:?}"))?;
            table
                .insert(extension, content_type)
                .context("Invalid content type mapping")?;
        }
        Ok(table)
    }

    /// Builds the message, validating both addresses.
    pub fn message(&self) -> Result<Message> {
        let from = Address::new(&self.from).context("Invalid sender")?;
        let to = Address::new(&self.to).context("Invalid recipient")?;

        let mut message = Message::new(from, to, &self.subject, &self.body);
        for path in &self.attachments {
            message = message.attach(Attachment::path(path));
        }
        if self.date {
            message = message.with_date(chrono::Local::now().fixed_offset());
        }
        Ok(message)
    }

    /// Returns credentials when a username is set.
    ///
    /// `password` is the value of [`PASSWORD_VAR`], if any.
    pub fn credentials(&self, password: Option<String>) -> Result<Option<Credentials>> {
        let Some(username) = &self.username else {
            return Ok(None);
        };
        let password =
            password.with_context(|| format!("{PASSWORD_VAR} must be set to authenticate"))?;
        Ok(Some(Credentials::new(username, password)))
    }
}
