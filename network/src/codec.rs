// SPDX-License-Identifier: MIT OR Apache-2.0

//! Length-prefixed JSON framing.
//!
//! Every frame is a 4-byte little-endian length followed by that many
//! bytes of UTF-8 JSON.

use crate::event::Event;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize an event into a complete frame
pub fn encode(event: &Event) -> Result<Bytes, CodecError> {
    let body = serde_json::to_vec(event)?;
    let len = u32::try_from(body.len()).map_err(|_| CodecError::FrameTooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + body.len());
    buf.put_u32_le(len);
    buf.extend_from_slice(&body);
    Ok(buf.freeze())
}

/// Parse a frame body (without its length prefix)
pub fn decode(body: &[u8]) -> Result<Event, CodecError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read one event. Returns `None` on a clean end of stream between frames.
pub async fn read_event<R>(reader: &mut R, max_len: usize) -> Result<Option<Event>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(header) as usize;
    if len > max_len {
        return Err(CodecError::FrameTooLarge { len, max: max_len });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    decode(&body).map(Some)
}

pub async fn write_event<W>(writer: &mut W, event: &Event) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(event)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
