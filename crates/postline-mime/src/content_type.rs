//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt;

/// MIME content type with parameters.
///
/// Parameters keep their insertion order so the rendered header is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a `text/plain; charset=utf-8` content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a bare `text/plain` content type, used when nothing better is known.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new("text", "plain")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        let value = value.into();
        if let Some(slot) = self.parameters.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.parameters.push((key, value));
        }
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a content type string, as given in a job file's type map.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s:?}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!(
                "Empty type or subtype: {s:?}"
            )));
        }

        let mut content_type = Self::new(main_type, sub_type);
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                content_type =
                    content_type.with_parameter(key.trim(), value.trim().trim_matches('"'));
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
