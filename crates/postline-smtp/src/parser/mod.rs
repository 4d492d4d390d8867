//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Separator marking a continuation line (`250-...`).
pub const CONTINUATION: u8 = b'-';

/// Parsed form of a single reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Status code.
    pub code: ReplyCode,
    /// True if more lines follow.
    pub continues: bool,
    /// Text after the separator.
    pub text: &'a str,
}

/// Parses one reply line (without its CRLF).
///
/// Accepted forms: `250`, `250 text`, `250-text`.
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] if the status-code prefix is not three
/// digits forming a code of at least 100, or the separator is neither a space
/// nor `-`.
pub fn parse_line(line: &str) -> Result<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    let code = bytes
        .get(..3)
        .and_then(ReplyCode::parse)
        .ok_or_else(|| Error::MalformedReply(format!("Invalid reply code: {line:?}")))?;

    match bytes.get(3) {
        None => Ok(ReplyLine {
            code,
            continues: false,
            text: "",
        }),
        Some(b' ') => Ok(ReplyLine {
            code,
            continues: false,
            text: &line[4..],
        }),
        Some(&CONTINUATION) => Ok(ReplyLine {
            code,
            continues: true,
            text: &line[4..],
        }),
        Some(_) => Err(Error::MalformedReply(format!(
            "Invalid separator after reply code: {line:?}"
        ))),
    }
}

/// Parses a complete SMTP reply from its lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if a line is malformed, if the lines disagree on the
/// code, or if the continuation markers do not end on the last line.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some((_, init)) = lines.split_last() else {
        return Err(Error::MalformedReply("Empty reply".into()));
    };

    let mut code = None;
    let mut message = Vec::with_capacity(lines.len());

    for (index, raw) in lines.iter().enumerate() {
        let line = parse_line(raw)?;
        let is_last = index == init.len();

        if line.continues == is_last {
            return Err(Error::MalformedReply(format!(
                "Unexpected continuation marker in {raw:?}"
            )));
        }

        match code {
            None => code = Some(line.code),
            Some(first) if first != line.code => {
                return Err(Error::MalformedReply(format!(
                    "Reply code changed from {first} to {} mid-reply",
                    line.code
                )));
            }
            Some(_) => {}
        }

        message.push(line.text.to_string());
    }

    let code = code.ok_or_else(|| Error::MalformedReply("Empty reply".into()))?;
    Ok(Reply::new(code, message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` (or nothing)
/// for the last line.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&CONTINUATION)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn test_parse_multi_line_reply() {
        let reply = parse_reply(&lines(&[
            "250-mx.example.com",
            "250-AUTH PLAIN CRAM-MD5",
            "250 STARTTLS",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(
            reply.message_text(),
            "mx.example.com\nAUTH PLAIN CRAM-MD5\nSTARTTLS"
        );
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&lines(&["250"])).unwrap();
        assert_eq!(reply.message, vec![""]);
    }

    #[test]
    fn test_parse_challenge() {
        let reply = parse_reply(&lines(&["334 PDEyMzQ1QGV4YW1wbGUuY29tPg=="])).unwrap();
        assert_eq!(reply.code, ReplyCode::AUTH_CONTINUE);
        assert_eq!(reply.first_line(), "PDEyMzQ1QGV4YW1wbGUuY29tPg==");
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_reply(&[]).is_err());
    }

    #[test]
    fn test_parse_error_bad_prefix() {
        for bad in ["25", "ABC OK", "2500 OK", "250_OK", "OK 250", "099 low"] {
            assert!(
                matches!(parse_reply(&lines(&[bad])), Err(Error::MalformedReply(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_any_three_digit_code() {
        let reply = parse_reply(&lines(&["600 weird"])).unwrap();
        assert_eq!(reply.code.as_u16(), 600);
        assert_eq!(reply.message, vec!["weird"]);

        let reply = parse_reply(&lines(&["199-one", "199 two"])).unwrap();
        assert_eq!(reply.code.as_u16(), 199);
    }

    #[test]
    fn test_parse_error_code_changes() {
        assert!(parse_reply(&lines(&["250-one", "251 two"])).is_err());
    }

    #[test]
    fn test_parse_error_misplaced_continuation() {
        assert!(parse_reply(&lines(&["250 one", "250 two"])).is_err());
        assert!(parse_reply(&lines(&["250-one", "250-two"])).is_err());
    }
}
