// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message framing over a byte stream:
//!
//! ```text
//! Content-Length: <decimal>\r\n
//! \r\n
//! <exactly N UTF-8 bytes>
//! ```
//!
//! Header parsing is case-insensitive, tolerates a bare `\n` in place of
//! `\r\n`, and ignores headers it doesn't recognize.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Messages larger than this are rejected with [`ProtocolError::MessageTooLarge`]
/// unless the caller passes an explicit limit to [`read_message_with_limit`].
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

const CONTENT_LENGTH_HEADER: &str = "content-length";

/// Read one framed message, using [`DEFAULT_MAX_MESSAGE_SIZE`] as the body
/// size limit.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    read_message_with_limit(reader, DEFAULT_MAX_MESSAGE_SIZE).await
}

/// Read one framed message, rejecting bodies larger than `max_size`.
pub async fn read_message_with_limit<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut content_length: Option<usize> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let bytes_read = read_header_line(reader, &mut line).await?;
        if bytes_read == 0 {
            return Err(ProtocolError::UnexpectedEof);
        }

        if line.is_empty() {
            break;
        }

        let text = std::str::from_utf8(&line)
            .map_err(|_| ProtocolError::InvalidContentLength("header is not valid UTF-8".into()))?;
        let Some((key, value)) = text.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case(CONTENT_LENGTH_HEADER) {
            continue;
        }
        let value = value.trim();
        let parsed = value
            .parse::<usize>()
            .map_err(|_| ProtocolError::InvalidContentLength(value.to_string()))?;
        content_length = Some(parsed);
    }

    let len = content_length.ok_or(ProtocolError::MissingContentLength)?;
    if len > max_size {
        return Err(ProtocolError::MessageTooLarge { size: len, max: max_size });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::UnexpectedEof
        } else {
            ProtocolError::Io(err)
        }
    })?;
    Ok(body)
}

/// Write one framed message: a `Content-Length` header followed by `body`,
/// flushed together.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a single header line, stripping a trailing `\r\n` or bare `\n`.
/// Returns the number of bytes consumed from `reader`, or `0` on EOF before
/// any byte was read.
async fn read_header_line<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, ProtocolError> {
    let mut total = 0usize;
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Ok(total);
        }
        total += 1;
        if byte[0] == b'\n' {
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            return Ok(total);
        }
        buf.push(byte[0]);
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
