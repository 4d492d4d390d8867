//! Extension-based content type inference for attachments.

use crate::content_type::ContentType;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Families and extensions of the standard table.
///
/// Each extension maps to `<family>/<extension>`.
const STANDARD_FAMILIES: &[(&str, &[&str])] = &[
    ("application", &["json", "html"]),
    ("image", &["jpeg", "jpg", "png"]),
    ("audio", &["mp3", "wav", "m4a"]),
    ("video", &["mp4", "mpg", "mkv", "3gp"]),
];

/// Mapping from file extension to content type.
///
/// Lookups are case-insensitive. Files whose extension is unknown, or that have
/// no extension, resolve to the fallback type (`text/plain` by default).
///
/// ```
/// use postline_mime::ContentTypeTable;
///
/// let table = ContentTypeTable::default();
/// assert_eq!(table.resolve("photo.JPG").to_string(), "image/jpg");
/// assert_eq!(table.resolve("notes.xyz").to_string(), "text/plain");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeTable {
    by_extension: HashMap<String, ContentType>,
    fallback: ContentType,
}

impl Default for ContentTypeTable {
    fn default() -> Self {
        STANDARD_FAMILIES
            .iter()
            .fold(Self::empty(), |table, (family, extensions)| {
                table.with_family(family, extensions)
            })
    }
}

impl ContentTypeTable {
    /// Creates a table with no entries and a `text/plain` fallback.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
            fallback: ContentType::fallback(),
        }
    }

    /// Registers `<family>/<ext>` for every extension in `extensions`.
    ///
    /// Blank extensions are ignored.
    #[must_use]
    pub fn with_family(mut self, family: &str, extensions: &[&str]) -> Self {
        for ext in extensions {
            if let Some(ext) = normalize(ext) {
                let content_type = ContentType::new(family, ext.clone());
                self.by_extension.insert(ext, content_type);
            }
        }
        self
    }

    /// Replaces the fallback content type.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ContentType) -> Self {
        self.fallback = fallback;
        self
    }

    /// Registers a content type for an extension, returning the previous one.
    ///
    /// A leading dot is accepted (`".pdf"` and `"pdf"` are the same key).
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is empty or contains a path separator.
    pub fn insert(
        &mut self,
        extension: &str,
        content_type: ContentType,
    ) -> Result<Option<ContentType>> {
        let key = normalize(extension)
            .filter(|ext| !ext.contains(['/', '\\', '.']))
            .ok_or_else(|| Error::InvalidExtension(extension.to_string()))?;
        Ok(self.by_extension.insert(key, content_type))
    }

    /// Looks up the content type registered for an extension.
    #[must_use]
    pub fn lookup(&self, extension: &str) -> Option<&ContentType> {
        normalize(extension).and_then(|ext| self.by_extension.get(&ext))
    }

    /// Infers the content type of a file name or path.
    #[must_use]
    pub fn resolve(&self, file_name: &str) -> ContentType {
        extension_of(file_name)
            .and_then(|ext| self.lookup(ext))
            .unwrap_or(&self.fallback)
            .clone()
    }

    /// Returns the fallback content type.
    #[must_use]
    pub const fn fallback(&self) -> &ContentType {
        &self.fallback
    }

    /// Returns the number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    /// Returns true if no extension is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

/// Returns the final segment of a `/`- or `\`-separated path.
#[must_use]
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Returns the text after the last dot of the file name, if any.
#[must_use]
pub fn extension_of(path: &str) -> Option<&str> {
    file_name_of(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

fn normalize(extension: &str) -> Option<String> {
    let ext = extension.trim().trim_start_matches('.');
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
