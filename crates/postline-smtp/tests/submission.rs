//! Wire-level checks of message submission.

#![allow(clippy::unwrap_used)]

mod support;

use postline_mime::{ContentType, ContentTypeTable};
use postline_smtp::{Address, Attachment, Config, DotEscaping, Error, Message, Security};
use support::{capture_session, plain_config, sent_text};

const ACCEPT_ALL: &[u8] = b"220 mx.example.com ESMTP\r\n\
250-mx.example.com\r\n250 8BITMIME\r\n\
250 OK\r\n\
250 OK\r\n\
354 Go ahead\r\n\
250 OK queued\r\n";

fn message(body: &str) -> Message {
    Message::new(
        Address::new("alice@example.com").unwrap(),
        Address::new("bob@example.org").unwrap(),
        "Report",
        body,
    )
}

/// Returns the DATA content: everything after `DATA\r\n`, terminator included.
fn data_section(sent: &str) -> &str {
    sent.split_once("DATA\r\n").map(|(_, data)| data).unwrap()
}

#[tokio::test]
async fn test_envelope_uses_sender_and_recipient() {
    let (mut session, sent) = capture_session(ACCEPT_ALL, plain_config()).await;
    session.send(&message("hi")).await.unwrap();

    let sent = sent_text(&sent);
    assert!(sent.starts_with(
        "EHLO localhost\r\nMAIL FROM:<alice@example.com>\r\nRCPT TO:<bob@example.org>\r\nDATA\r\n"
    ));
    assert!(sent.ends_with("--boundary1--\r\n.\r\n"));
}

#[tokio::test]
async fn test_body_lines_are_dot_stuffed() {
    let (mut session, sent) = capture_session(ACCEPT_ALL, plain_config()).await;
    session
        .send(&message("first\n.\n..two\nlast."))
        .await
        .unwrap();

    let sent = sent_text(&sent);
    let data = data_section(&sent);
    assert!(data.contains("\r\n\r\nfirst\r\n..\r\n...two\r\nlast.\r\n\r\n--boundary1--"));
    assert_eq!(data.matches("\r\n.\r\n").count(), 1);
}

#[tokio::test]
async fn test_coarse_escaping_breaks_after_periods() {
    let config = Config::builder("mx.example.com")
        .security(Security::None)
        .dot_escaping(DotEscaping::Coarse)
        .build();
    let (mut session, sent) = capture_session(ACCEPT_ALL, config).await;
    session.send(&message("Hello. World.")).await.unwrap();

    let sent = sent_text(&sent);
    assert!(data_section(&sent).contains(
        "charset=utf-8\r\n\r\nHello.\r\n World.\r\n\r\n\r\n--boundary1--"
    ));
}

#[tokio::test]
async fn test_file_attachment_part() {
    let dir = std::env::temp_dir().join(format!("postline-submission-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("chart.png");
    tokio::fs::write(&path, b"\x89PNG\n.hidden\n").await.unwrap();

    let (mut session, sent) = capture_session(ACCEPT_ALL, plain_config()).await;
    let result = session
        .send(&message("see attached").attach(Attachment::path(&path)))
        .await;
    tokio::fs::remove_dir_all(&dir).await.unwrap();
    result.unwrap();

    let sent = sent_text(&sent);
    assert!(data_section(&sent).contains(
        "--boundary1\r\n\
         Content-Type: image/png\r\n\
         Content-Disposition: attachment; filename=chart.png\r\n\
         \r\n\
         \u{fffd}PNG\r\n\
         ..hidden\r\n\
         \r\n\
         --boundary1--\r\n"
    ));
}

#[tokio::test]
async fn test_unknown_extension_falls_back_to_text_plain() {
    let (mut session, sent) = capture_session(ACCEPT_ALL, plain_config()).await;
    session
        .send(&message("x").attach(Attachment::inline("notes.xyz", "a\nb")))
        .await
        .unwrap();

    let sent = sent_text(&sent);
    assert!(sent.contains("Content-Type: text/plain\r\nContent-Disposition: attachment; filename=notes.xyz\r\n"));
}

#[tokio::test]
async fn test_custom_content_type_table() {
    let table = ContentTypeTable::default()
        .with_family("text", &["csv"])
        .with_fallback(ContentType::new("application", "octet-stream"));
    let config = Config::builder("mx.example.com")
        .security(Security::None)
        .content_types(table)
        .build();
    let (mut session, sent) = capture_session(ACCEPT_ALL, config).await;

    let message = message("x")
        .attach(Attachment::inline("data.csv", "a,b"))
        .attach(Attachment::inline("blob", vec![0_u8, 1, 2]));
    session.send(&message).await.unwrap();

    let sent = sent_text(&sent);
    assert!(sent.contains("Content-Type: text/csv\r\n"));
    assert!(sent.contains("Content-Type: application/octet-stream\r\n"));
}

#[tokio::test]
async fn test_missing_attachment_sends_nothing() {
    let (mut session, sent) = capture_session(ACCEPT_ALL, plain_config()).await;
    let message = message("x").attach(Attachment::path("/nonexistent/postline/report.pdf"));

    let err = session.send(&message).await.unwrap_err();
    assert!(matches!(err, Error::Attachment { .. }));
    assert_eq!(sent_text(&sent), "EHLO localhost\r\n");
}

#[tokio::test]
async fn test_custom_boundary_and_date() {
    let config = Config::builder("mx.example.com")
        .security(Security::None)
        .boundary("=_postline_42")
        .build();
    let (mut session, sent) = capture_session(ACCEPT_ALL, config).await;
    let date = chrono::DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();

    session.send(&message("x").with_date(date)).await.unwrap();

    let sent = sent_text(&sent);
    let data = data_section(&sent);
    assert!(data.contains("Date: Tue, 1 Jul 2003 10:52:37 +0200\r\nMIME-Version: 1.0\r\n"));
    assert!(data.contains("Content-Type: multipart/mixed; boundary=\"=_postline_42\"\r\n"));
    assert!(data.ends_with("--=_postline_42--\r\n.\r\n"));
}
