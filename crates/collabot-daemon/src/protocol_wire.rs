// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format encoding/decoding for the socket transport (spec §6).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::protocol::RpcRequest;

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,
}

/// Maximum message size (200 MB).
pub const MAX_MESSAGE_SIZE: usize = 200 * 1024 * 1024;

/// Default IPC timeout for one-shot client requests.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Encode a message to JSON bytes (without length prefix).
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(json)
}

/// Decode a message from wire format.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader. Blocks until a full
/// frame arrives or the connection closes; callers that need a bound should
/// wrap this in `tokio::time::timeout` themselves (see [`read_request`]).
pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer.
pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one [`RpcRequest`] with a timeout. Used by the CLI's one-shot
/// client; the daemon's listener reads requests without a timeout since a
/// connection may sit idle between calls while still receiving
/// notifications (see `listener::handle_connection`).
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<RpcRequest, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write any serializable outbound frame (a response or a notification)
/// with a timeout, so a slow/blocked client cannot stall the listener.
pub async fn write_frame<W: tokio::io::AsyncWriteExt + Unpin, T: Serialize>(
    writer: &mut W,
    frame: &T,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(frame)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RpcError, RpcResponse};
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_a_request_through_the_wire_format() {
        let request = RpcRequest {
            jsonrpc: "2.0".into(),
            id: json!(1),
            method: "list_agents".into(),
            params: json!({}),
        };
        let mut buf = Vec::new();
        let data = encode(&request).unwrap();
        write_message(&mut buf, &data).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let read_back: RpcRequest = decode(&read_message(&mut cursor).await.unwrap()).unwrap();
        assert_eq!(read_back.method, "list_agents");
    }

    #[tokio::test]
    async fn read_message_on_empty_stream_reports_connection_closed() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_message(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_allocating() {
        let mut cursor = std::io::Cursor::new((MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes().to_vec());
        let err = read_message(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn write_frame_round_trips_a_response() {
        let response = RpcResponse {
            jsonrpc: "2.0".into(),
            id: json!(1),
            result: Some(json!({"ok": true})),
            error: None::<RpcError>,
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &response, DEFAULT_TIMEOUT).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let read_back: RpcResponse = decode(&read_message(&mut cursor).await.unwrap()).unwrap();
        assert_eq!(read_back.result, Some(json!({"ok": true})));
    }
}
