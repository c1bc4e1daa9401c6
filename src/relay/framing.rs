//! Native messaging wire format: a 32-bit length in native byte order
//! followed by that many bytes of UTF-8 JSON.

use serde_json::Value;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message the browser side may send to a helper.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;
/// Largest reply a helper may send back.
pub const MAX_REPLY_BYTES: usize = 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Message of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },
    #[error("Stream ended in the middle of a message")]
    Truncated,
    #[error("Invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_message(message: &Value, max: usize) -> Result<Vec<u8>, FrameError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > max {
        return Err(FrameError::Oversized {
            len: body.len(),
            max,
        });
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_message<W>(writer: &mut W, message: &Value, max: usize) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_message(message, max)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one message. `Ok(None)` means the stream closed cleanly before a length prefix.
pub async fn read_message<R>(reader: &mut R, max: usize) -> Result<Option<Value>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FrameError::Truncated);
        }
        filled += n;
    }

    let len = u32::from_ne_bytes(len_buf) as usize;
    if len > max {
        return Err(FrameError::Oversized { len, max });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })?;

    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_prefixes_native_length() {
        let frame = encode_message(&json!({"status": "success"}), MAX_REPLY_BYTES).unwrap();
        let body = br#"{"status":"success"}"#;

        assert_eq!(&frame[..4], &(body.len() as u32).to_ne_bytes());
        assert_eq!(&frame[4..], body);
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let err = encode_message(&json!({"nbib_data": "x".repeat(64)}), 16).unwrap_err();
        assert!(matches!(err, FrameError::Oversized { max: 16, .. }));
    }

    #[tokio::test]
    async fn test_write_then_read_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let message = json!({"nbib_data": "PMID- 1\nTI  - Ünïcode title\n"});

        write_message(&mut client, &message, MAX_REQUEST_BYTES).await.unwrap();
        let received = read_message(&mut server, MAX_REQUEST_BYTES).await.unwrap();

        assert_eq!(received, Some(message));
    }

    #[tokio::test]
    async fn test_read_clean_eof_is_none() {
        let mut empty: &[u8] = &[];
        assert!(read_message(&mut empty, MAX_REPLY_BYTES).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_partial_prefix_is_truncated() {
        let mut partial: &[u8] = &[1, 0];
        let err = read_message(&mut partial, MAX_REPLY_BYTES).await.unwrap_err();
        assert!(matches!(err, FrameError::Truncated));
    }

    #[tokio::test]
    async fn test_read_short_body_is_truncated() {
        let mut bytes = 10u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let mut reader: &[u8] = &bytes;

        let err = read_message(&mut reader, MAX_REPLY_BYTES).await.unwrap_err();
        assert!(matches!(err, FrameError::Truncated));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_length() {
        let bytes = (MAX_REPLY_BYTES as u32 + 1).to_ne_bytes();
        let mut reader: &[u8] = &bytes;

        let err = read_message(&mut reader, MAX_REPLY_BYTES).await.unwrap_err();
        assert!(matches!(err, FrameError::Oversized { .. }));
    }

    #[tokio::test]
    async fn test_read_invalid_json() {
        let mut bytes = 3u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(b"{{{");
        let mut reader: &[u8] = &bytes;

        let err = read_message(&mut reader, MAX_REPLY_BYTES).await.unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
    }
}
