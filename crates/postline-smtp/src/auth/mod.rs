//! SASL authentication for SMTP.
//!
//! Implements:
//! - PLAIN (RFC 4616) - credentials sent as the initial response
//! - CRAM-MD5 (RFC 2195) - HMAC-MD5 response to a server challenge
//!
//! The functions here only compute payloads; the exchange itself is driven by
//! [`Session::authenticate`](crate::Session::authenticate).

use crate::error::{Error, Result};
use crate::types::{AuthMechanism, Capabilities};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;
use std::fmt;

type HmacMd5 = Hmac<Md5>;

/// Username and password.
///
/// Immutable once built; `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the authentication mechanism is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// PLAIN when TLS is active, CRAM-MD5 otherwise. Capabilities are ignored.
    #[default]
    TlsDriven,
    /// Pick from the mechanisms the server announced under `AUTH`.
    ///
    /// Over TLS PLAIN is preferred, then CRAM-MD5. Without TLS only CRAM-MD5
    /// is used, so the password never travels in clear text.
    CapabilityNegotiated,
}

/// Chooses the mechanism for an authentication attempt.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the policy finds no usable mechanism.
pub fn select_mechanism(
    policy: AuthPolicy,
    tls_active: bool,
    capabilities: &Capabilities,
) -> Result<AuthMechanism> {
    match policy {
        AuthPolicy::TlsDriven if tls_active => Ok(AuthMechanism::Plain),
        AuthPolicy::TlsDriven => Ok(AuthMechanism::CramMd5),
        AuthPolicy::CapabilityNegotiated => {
            let offered = capabilities.auth_mechanisms();
            let preference: &[AuthMechanism] = if tls_active {
                &[AuthMechanism::Plain, AuthMechanism::CramMd5]
            } else {
                &[AuthMechanism::CramMd5]
            };

            preference
                .iter()
                .copied()
                .find(|m| offered.contains(m))
                .ok_or_else(|| {
                    Error::Auth(format!(
                        "No usable mechanism (server offers {:?}, TLS active: {tls_active})",
                        capabilities.capabilities_of("AUTH")
                    ))
                })
        }
    }
}

/// Generates the PLAIN initial response (RFC 4616).
///
/// Format: base64 of `\0<username>\0<password>` (empty authorization identity).
#[must_use]
pub fn plain_response(credentials: &Credentials) -> String {
    let mut payload = Vec::with_capacity(credentials.username.len() + credentials.password.len() + 2);
    payload.push(0);
    payload.extend_from_slice(credentials.username.as_bytes());
    payload.push(0);
    payload.extend_from_slice(credentials.password.as_bytes());
    STANDARD.encode(payload)
}

/// Answers a CRAM-MD5 challenge (RFC 2195).
///
/// The challenge is the base64 text of the 334 reply. The answer is base64 of
/// `<username> <hex(HMAC-MD5(password, challenge))>`, hex in lowercase.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the challenge is not valid base64 or the digest
/// cannot be keyed.
pub fn cram_md5_response(credentials: &Credentials, challenge: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge.trim())
        .map_err(|e| Error::Auth(format!("Invalid CRAM-MD5 challenge: {e}")))?;

    let mut mac = HmacMd5::new_from_slice(credentials.password.as_bytes())
        .map_err(|e| Error::Auth(format!("Cannot key HMAC-MD5: {e}")))?;
    mac.update(&challenge);
    let digest = hex::encode(mac.finalize().into_bytes());

    Ok(STANDARD.encode(format!("{} {digest}", credentials.username)))
}
