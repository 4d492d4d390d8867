//! Multipart message composition.
//!
//! A [`Message`] is rendered as `multipart/mixed`: a `text/plain` part for the
//! body followed by one part per attachment. Content is sent without transfer
//! encoding, so every content line goes through dot-stuffing before it reaches
//! the wire and a lone `.` can only ever be the end-of-data terminator.

use std::borrow::Cow;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use postline_mime::{ContentType, ContentTypeTable, Headers, Multipart, Part, body_lines};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::Address;

/// How body text is escaped before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotEscaping {
    /// Split on line breaks and double any leading `.`.
    #[default]
    LineLeading,
    /// Split the text after every `.` (keeping the dot) and then on line
    /// breaks; lines starting with `.` are still doubled.
    ///
    /// This reproduces the line layout of older clients that broke bodies at
    /// each period.
    Coarse,
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Envelope sender, also the `From` header.
    pub from: Address,
    /// Envelope recipient, also the `To` header.
    pub to: Address,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Optional `Date` header.
    pub date: Option<DateTime<FixedOffset>>,
    /// Attachments, in order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Creates a message without attachments.
    #[must_use]
    pub fn new(
        from: Address,
        to: Address,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            body: body.into(),
            date: None,
            attachments: Vec::new(),
        }
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Sets the `Date` header.
    #[must_use]
    pub const fn with_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds the top-level header block.
    #[must_use]
    pub fn headers(&self, multipart: &Multipart) -> Headers {
        let mut headers = Headers::new();
        headers.add("From", self.from.as_str());
        headers.add("To", self.to.as_str());
        headers.add("Subject", self.subject.as_str());
        if let Some(date) = &self.date {
            headers.add("Date", date.to_rfc2822());
        }
        headers.add("MIME-Version", "1.0");
        headers.add("Content-Type", multipart.content_type().to_string());
        headers
    }
}

/// Attachment source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// File read when the message is sent.
    Path(PathBuf),
    /// In-memory content.
    Inline {
        /// File name used for the content type and the disposition header.
        filename: String,
        /// Content.
        data: Vec<u8>,
    },
}

impl Attachment {
    /// Attaches a file.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Attaches in-memory content.
    #[must_use]
    pub fn inline(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Inline {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Loads the content and builds the MIME part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if a file cannot be read.
    pub async fn resolve(&self, table: &ContentTypeTable) -> Result<Part> {
        match self {
            Self::Path(path) => {
                let data = tokio::fs::read(path).await.map_err(|source| Error::Attachment {
                    path: path.clone(),
                    source,
                })?;
                Ok(Part::attachment(&path.to_string_lossy(), data, table))
            }
            Self::Inline { filename, data } => Ok(Part::attachment(filename, data.clone(), table)),
        }
    }
}

/// Doubles a leading `.`.
#[must_use]
pub fn stuff_line(line: &[u8]) -> Cow<'_, [u8]> {
    if line.first() == Some(&b'.') {
        let mut stuffed = Vec::with_capacity(line.len() + 1);
        stuffed.push(b'.');
        stuffed.extend_from_slice(line);
        Cow::Owned(stuffed)
    } else {
        Cow::Borrowed(line)
    }
}

/// Splits body text into escaped lines.
#[must_use]
pub fn escape_text(body: &str, escaping: DotEscaping) -> Vec<Cow<'_, [u8]>> {
    match escaping {
        DotEscaping::LineLeading => body_lines(body.as_bytes()).map(stuff_line).collect(),
        DotEscaping::Coarse => {
            let segments: Vec<&str> = body.split('.').collect();
            let last = segments.len().saturating_sub(1);
            let mut lines = Vec::new();

            for (index, segment) in segments.into_iter().enumerate() {
                let piece = if index == last {
                    Cow::Borrowed(segment)
                } else {
                    Cow::Owned(format!("{segment}."))
                };
                for line in piece.split('\n') {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    lines.push(Cow::Owned(stuff_line(line.as_bytes()).into_owned()));
                }
            }
            lines
        }
    }
}

/// Renders the DATA content of a message, excluding the terminator.
///
/// The body text is escaped per `escaping`; attachment lines always have a
/// leading `.` doubled.
#[must_use]
pub fn compose<'a>(
    message: &'a Message,
    attachments: &'a [Part],
    multipart: &Multipart,
    escaping: DotEscaping,
) -> Vec<Cow<'a, [u8]>> {
    let mut lines: Vec<Cow<'a, [u8]>> = message.headers(multipart).lines().map(owned).collect();
    lines.push(owned(String::new()));

    if multipart.collides_with(message.body.as_bytes()) {
        warn!(boundary = multipart.boundary(), "message body contains the multipart boundary");
    }
    lines.push(owned(multipart.delimiter()));
    lines.push(owned(format!("Content-Type: {}", ContentType::text_plain())));
    lines.push(owned(String::new()));
    lines.extend(escape_text(&message.body, escaping));
    lines.push(owned(String::new()));

    for part in attachments {
        if multipart.collides_with(&part.body) {
            warn!(
                boundary = multipart.boundary(),
                filename = part.filename.as_deref().unwrap_or_default(),
                "attachment contains the multipart boundary"
            );
        }
        lines.push(owned(multipart.delimiter()));
        lines.extend(part.headers().lines().map(owned));
        lines.push(owned(String::new()));
        lines.extend(part.lines().map(stuff_line));
        lines.push(owned(String::new()));
    }

    lines.push(owned(multipart.close_delimiter()));
    lines
}

fn owned<'a>(line: String) -> Cow<'a, [u8]> {
    Cow::Owned(line.into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(lines: &[Cow<'_, [u8]>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    fn message(body: &str) -> Message {
        Message::new(
            Address::new("alice@example.com").unwrap(),
            Address::new("bob@example.org").unwrap(),
            "Greetings",
            body,
        )
    }

    #[test]
    fn test_stuff_line() {
        assert_eq!(stuff_line(b".").as_ref(), b"..");
        assert_eq!(stuff_line(b".hidden").as_ref(), b"..hidden");
        assert_eq!(stuff_line(b"a.b").as_ref(), b"a.b");
        assert!(matches!(stuff_line(b"plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_line_leading_escaping() {
        let lines = escape_text("a\r\n.b\n..c\n.", DotEscaping::LineLeading);
        assert_eq!(text(&lines), vec!["a", "..b", "...c", ".."]);
    }

    #[test]
    fn test_line_leading_keeps_inner_dots() {
        let lines = escape_text("Hello. World.", DotEscaping::LineLeading);
        assert_eq!(text(&lines), vec!["Hello. World."]);
    }

    #[test]
    fn test_coarse_escaping_breaks_after_each_dot() {
        let lines = escape_text("Hello. World.", DotEscaping::Coarse);
        assert_eq!(text(&lines), vec!["Hello.", " World.", ""]);
    }

    #[test]
    fn test_coarse_escaping_never_emits_lone_dot() {
        let lines = escape_text("a..b", DotEscaping::Coarse);
        assert_eq!(text(&lines), vec!["a.", "..", "b"]);
    }

    #[test]
    fn test_empty_body() {
        assert!(escape_text("", DotEscaping::LineLeading).is_empty());
        assert_eq!(text(&escape_text("", DotEscaping::Coarse)), vec![""]);
    }

    #[test]
    fn test_compose_layout() {
        let message = message("Hi\n.dot").attach(Attachment::inline("photo.png", b"PNG\n.data".to_vec()));
        let parts = vec![Part::attachment(
            "photo.png",
            b"PNG\n.data".to_vec(),
            &ContentTypeTable::default(),
        )];
        let lines = compose(&message, &parts, &Multipart::default(), DotEscaping::LineLeading);

        assert_eq!(
            text(&lines),
            vec![
                "From: alice@example.com",
                "To: bob@example.org",
                "Subject: Greetings",
                "MIME-Version: 1.0",
                "Content-Type: multipart/mixed; boundary=boundary1",
                "",
                "--boundary1",
                "Content-Type: text/plain; charset=utf-8",
                "",
                "Hi",
                "..dot",
                "",
                "--boundary1",
                "Content-Type: image/png",
                "Content-Disposition: attachment; filename=photo.png",
                "",
                "PNG",
                "..data",
                "",
                "--boundary1--",
            ]
        );
    }

    #[test]
    fn test_compose_date_header() {
        let date = DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        let message = message("x").with_date(date);
        let lines = text(&compose(&message, &[], &Multipart::default(), DotEscaping::default()));
        assert_eq!(lines[3], "Date: Tue, 1 Jul 2003 10:52:37 +0200");
        assert_eq!(lines[4], "MIME-Version: 1.0");
    }

    #[test]
    fn test_subject_cannot_inject_headers() {
        let mut message = message("x");
        message.subject = "hi\r\nBcc: eve@example.net".to_string();
        let lines = text(&compose(&message, &[], &Multipart::default(), DotEscaping::default()));
        assert!(lines.iter().all(|l| !l.starts_with("Bcc:")));
    }

    #[tokio::test]
    async fn test_resolve_inline_uses_table() {
        let part = Attachment::inline("clip.mp4", vec![1, 2, 3])
            .resolve(&ContentTypeTable::default())
            .await
            .unwrap();
        assert_eq!(part.content_type.to_string(), "video/mp4");
        assert_eq!(part.filename.as_deref(), Some("clip.mp4"));
    }

    #[tokio::test]
    async fn test_resolve_path_keeps_file_name() {
        let dir = std::env::temp_dir().join(format!("postline-compose-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("report.json");
        tokio::fs::write(&path, b"{}\n").await.unwrap();

        let part = Attachment::path(&path)
            .resolve(&ContentTypeTable::default())
            .await
            .unwrap();
        tokio::fs::remove_dir_all(&dir).await.unwrap();

        assert_eq!(part.filename.as_deref(), Some("report.json"));
        assert_eq!(part.content_type.to_string(), "application/json");
        assert_eq!(part.body, b"{}\n");
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let err = Attachment::path("/nonexistent/postline/missing.png")
            .resolve(&ContentTypeTable::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Attachment { ref path, .. } if path.ends_with("missing.png")));
    }

    proptest! {
        #[test]
        fn line_leading_round_trips(body in "[a-z. \n]{0,40}") {
            let lines = escape_text(&body, DotEscaping::LineLeading);
            let restored: Vec<&[u8]> = lines
                .iter()
                .map(|l| if l.starts_with(b".") { &l[1..] } else { &l[..] })
                .collect();
            let joined = restored.join(&b'\n');
            let expected = body.strip_suffix('\n').unwrap_or(&body);
            prop_assert_eq!(joined, expected.as_bytes());
        }

        #[test]
        fn no_mode_emits_a_lone_dot(body in "[a-z. \r\n]{0,40}") {
            for mode in [DotEscaping::LineLeading, DotEscaping::Coarse] {
                for line in escape_text(&body, mode) {
                    prop_assert_ne!(line.as_ref(), b".".as_slice());
                }
            }
        }
    }
}
