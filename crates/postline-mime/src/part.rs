//! MIME body parts.

use crate::content_type::ContentType;
use crate::header::Headers;
use crate::table::{ContentTypeTable, file_name_of};

/// A single part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Content type of the part.
    pub content_type: ContentType,
    /// File name, set for attachments.
    pub filename: Option<String>,
    /// Raw body bytes, transmitted without transfer encoding.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates an attachment part, inferring its content type from the name.
    ///
    /// `name` may be a path; only its final segment is kept as the file name.
    #[must_use]
    pub fn attachment(name: &str, body: Vec<u8>, table: &ContentTypeTable) -> Self {
        let filename = file_name_of(name).to_string();
        Self {
            content_type: table.resolve(&filename),
            filename: Some(filename),
            body,
        }
    }

    /// Builds the part headers.
    #[must_use]
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.add("Content-Type", self.content_type.to_string());
        if let Some(filename) = &self.filename {
            headers.add(
                "Content-Disposition",
                format!("attachment; filename={filename}"),
            );
        }
        headers
    }

    /// Iterates over the body lines, see [`body_lines`].
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        body_lines(&self.body)
    }
}

/// Splits content into lines.
///
/// Lines are split on LF with a trailing CR removed; a final line terminator
/// does not produce an extra empty line, and empty content has no lines.
pub fn body_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    let trimmed = content.strip_suffix(b"\n").unwrap_or(content);
    let empty = content.is_empty();
    trimmed
        .split(|&b| b == b'\n')
        .filter(move |_| !empty)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(part: &Part) -> Vec<&[u8]> {
        part.lines().collect()
    }

    #[test]
    fn test_attachment_without_extension() {
        let table = ContentTypeTable::default();
        let part = Part::attachment("LICENSE", b"MIT".to_vec(), &table);
        let rendered: Vec<String> = part.headers().lines().collect();
        assert_eq!(
            rendered,
            vec![
                "Content-Type: text/plain",
                "Content-Disposition: attachment; filename=LICENSE",
            ]
        );
    }

    #[test]
    fn test_attachment_headers() {
        let table = ContentTypeTable::default();
        let part = Part::attachment("/home/me/photo.JPG", vec![1, 2, 3], &table);
        assert_eq!(part.filename.as_deref(), Some("photo.JPG"));

        let rendered: Vec<String> = part.headers().lines().collect();
        assert_eq!(
            rendered,
            vec![
                "Content-Type: image/jpg",
                "Content-Disposition: attachment; filename=photo.JPG",
            ]
        );
    }

    #[test]
    fn test_lines_strip_terminators() {
        let table = ContentTypeTable::default();
        let part = Part::attachment("a.txt", b"one\r\ntwo\nthree\n".to_vec(), &table);
        assert_eq!(
            lines(&part),
            vec![b"one".as_slice(), b"two".as_slice(), b"three".as_slice()]
        );
    }

    #[test]
    fn test_lines_keep_inner_blank_lines() {
        assert_eq!(
            body_lines(b"a\n\nb").collect::<Vec<_>>(),
            vec![b"a".as_slice(), b"".as_slice(), b"b".as_slice()]
        );
        assert_eq!(body_lines(b"\n").collect::<Vec<_>>(), vec![b"".as_slice()]);
    }

    #[test]
    fn test_empty_body_has_no_lines() {
        let table = ContentTypeTable::default();
        let part = Part::attachment("empty.bin", Vec::new(), &table);
        assert!(lines(&part).is_empty());
    }

    #[test]
    fn test_binary_lines_are_untouched() {
        let table = ContentTypeTable::default();
        let part = Part::attachment("x.png", vec![0x89, b'P', 0xff, b'\n', 0x00], &table);
        assert_eq!(
            lines(&part),
            vec![[0x89, b'P', 0xff].as_slice(), [0x00].as_slice()]
        );
    }
}
