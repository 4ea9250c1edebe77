// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Cursor;

use super::*;

#[tokio::test]
async fn write_then_read_roundtrips_the_body() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"hello world").await.unwrap();

    let mut cursor = Cursor::new(buffer);
    let body = read_message(&mut cursor).await.unwrap();
    assert_eq!(body, b"hello world");
}

#[tokio::test]
async fn write_message_uses_crlf_header() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"{}").await.unwrap();

    let text = String::from_utf8(buffer).unwrap();
    assert_eq!(text, "Content-Length: 2\r\n\r\n{}");
}

#[tokio::test]
async fn header_parsing_is_case_insensitive() {
    let mut buffer = Vec::from(&b"content-LENGTH: 5\r\n\r\nhello"[..]);
    let body = read_message(&mut Cursor::new(&mut buffer)).await.unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn header_parsing_tolerates_bare_lf() {
    let mut buffer = Vec::from(&b"Content-Length: 5\n\nhello"[..]);
    let body = read_message(&mut Cursor::new(&mut buffer)).await.unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn unknown_headers_are_ignored() {
    let mut buffer = Vec::from(&b"X-Trace-Id: abc123\r\nContent-Length: 5\r\n\r\nhello"[..]);
    let body = read_message(&mut Cursor::new(&mut buffer)).await.unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn missing_content_length_is_an_error() {
    let mut buffer = Vec::from(&b"X-Trace-Id: abc123\r\n\r\nhello"[..]);
    let err = read_message(&mut Cursor::new(&mut buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MissingContentLength));
}

#[tokio::test]
async fn non_numeric_content_length_is_an_error() {
    let mut buffer = Vec::from(&b"Content-Length: not-a-number\r\n\r\nhello"[..]);
    let err = read_message(&mut Cursor::new(&mut buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidContentLength(_)));
}

#[tokio::test]
async fn oversized_message_is_rejected_before_reading_the_body() {
    let mut buffer = Vec::from(&b"Content-Length: 999999999999\r\n\r\n"[..]);
    let err = read_message_with_limit(&mut Cursor::new(&mut buffer), 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn truncated_body_is_unexpected_eof() {
    let mut buffer = Vec::from(&b"Content-Length: 100\r\n\r\nshort"[..]);
    let err = read_message(&mut Cursor::new(&mut buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnexpectedEof));
}

#[tokio::test]
async fn clean_close_before_any_header_is_unexpected_eof() {
    let mut buffer: Vec<u8> = Vec::new();
    let err = read_message(&mut Cursor::new(&mut buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnexpectedEof));
}

proptest::proptest! {
    #[test]
    fn arbitrary_bodies_roundtrip(body in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut buffer = Vec::new();
            write_message(&mut buffer, &body).await.unwrap();
            let mut cursor = Cursor::new(buffer);
            let read_back = read_message(&mut cursor).await.unwrap();
            prop_assert_eq!(read_back, body);
            Ok(())
        })?;
    }
}
