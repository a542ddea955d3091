//! Length-prefixed framing and JSON payload encoding.
//!
//! [`FrameCodec`] is a tokio-util `Encoder`/`Decoder` for the frame layer. The
//! connection drives the same framing by hand over its buffered stream, because
//! raw byte transfers interleave with frames on one transport.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, Result};

/// Size of the big-endian length prefix
pub const HEADER_LEN: usize = 4;

/// Frame codec bounded by a maximum payload length
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_SIZE)
    }
}

impl FrameCodec {
    /// Create a codec accepting payloads up to `max_frame_len` bytes.
    ///
    /// The bound is clamped to what a 32-bit length prefix can express.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Reject a declared or outgoing payload length above the bound.
    #[inline]
    pub fn check_len(&self, len: usize) -> Result<()> {
        if len > self.max_frame_len {
            return Err(ProtocolError::OversizedMessage(len));
        }
        Ok(())
    }

    /// Parse the length prefix
    #[inline]
    pub fn decode_header(&self, header: [u8; HEADER_LEN]) -> Result<usize> {
        let len = u32::from_be_bytes(header) as usize;
        self.check_len(len)?;
        Ok(len)
    }
}

impl<'a> Encoder<&'a [u8]> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, payload: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        self.check_len(payload.len())?;
        dst.reserve(HEADER_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&src[..HEADER_LEN]);
        let len = self.decode_header(header)?;

        let total = HEADER_LEN + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(len)))
    }
}

/// Encode a value to its JSON payload
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Decode a JSON payload. An empty payload is a decode error, not a framing error.
pub fn decode_payload<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}
