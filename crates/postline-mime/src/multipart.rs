//! Multipart boundary handling.

use crate::content_type::ContentType;

/// Boundary used when none is configured.
pub const DEFAULT_BOUNDARY: &str = "boundary1";

/// A `multipart/mixed` layout with a fixed boundary.
///
/// The boundary is static, so nothing guarantees it is absent from the parts.
/// Use [`Multipart::collides_with`] to detect content that would be misread as
/// a delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    boundary: String,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNDARY)
    }
}

impl Multipart {
    /// Creates a layout with the given boundary.
    #[must_use]
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    /// Returns the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Returns the `multipart/mixed` content type carrying the boundary.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::multipart_mixed(self.boundary.clone())
    }

    /// Line that opens each part: `--<boundary>`.
    #[must_use]
    pub fn delimiter(&self) -> String {
        format!("--{}", self.boundary)
    }

    /// Line that ends the multipart body: `--<boundary>--`.
    #[must_use]
    pub fn close_delimiter(&self) -> String {
        format!("--{}--", self.boundary)
    }

    /// Returns true if any line of `content` starts with the delimiter.
    #[must_use]
    pub fn collides_with(&self, content: &[u8]) -> bool {
        let delimiter = self.delimiter();
        content
            .split(|&b| b == b'\n')
            .any(|line| line.starts_with(delimiter.as_bytes()))
    }
}
