//! Email address types.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
///
/// Only values that would corrupt the `MAIL FROM:<...>` / `RCPT TO:<...>`
/// command line are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.contains(['\r', '\n', '<', '>']) || addr.chars().any(char::is_whitespace) {
            return Err(Error::InvalidAddress(format!(
                "Address contains forbidden characters: {addr:?}"
            )));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress("Address must contain @".into()));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(
                "Address must have exactly one @".into(),
            ));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(
                "Local and domain parts cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("janedoe@example.org").unwrap();
        assert_eq!(addr.as_str(), "janedoe@example.org");
        assert_eq!(addr.domain(), "example.org");
    }

    #[test]
    fn test_parse_from_str() {
        let addr: Address = "johndoe@example.com".parse().unwrap();
        assert_eq!(addr.to_string(), "johndoe@example.com");
    }

    #[test]
    fn test_invalid_addresses() {
        for bad in [
            "",
            "userexample.com",
            "@example.com",
            "user@",
            "a@b@c",
            "user@example.com>\r\nRCPT TO:<x@y",
            "user name@example.com",
        ] {
            assert!(Address::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
