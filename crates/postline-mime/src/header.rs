//! MIME header handling.

/// Ordered collection of message or part headers.
///
/// Names keep the case they were added with. Values are kept on a single
/// line: embedded CR and LF characters are replaced with spaces so a value can
/// never start a new header or end the header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), single_line(&value.into())));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Renders each header as a `Name: value` line, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(name, value)| format!("{name}: {value}"))
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
