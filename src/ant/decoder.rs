//! # ANT Message Decoder
//!
//! Decodes ANT serial frames, either one complete frame at a time or out of a
//! byte stream that may contain partial frames and line noise.

use bytes::{Buf, BytesMut};

use super::checksum::xor_checksum;
use super::protocol::*;
use crate::error::{AntChirpError, Result};

/// Sync + Length + Message ID + Checksum
const FRAME_OVERHEAD: usize = 4;

/// Decode a complete ANT frame
///
/// # Arguments
///
/// * `frame` - Complete ANT frame bytes (sync, length, id, data, checksum)
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Sync byte is incorrect
/// - Length field exceeds the maximum data size
/// - Checksum does not match
pub fn decode_frame(frame: &[u8]) -> Result<AntMessage> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(AntChirpError::MalformedFrame("Frame too short".to_string()));
    }

    if frame[0] != ANT_SYNC_BYTE {
        return Err(AntChirpError::MalformedFrame(format!(
            "Invalid sync byte: 0x{:02X}",
            frame[0]
        )));
    }

    let length = frame[1] as usize;
    if length > ANT_MAX_DATA_SIZE {
        return Err(AntChirpError::MalformedFrame(format!(
            "Length {} exceeds maximum {}",
            length, ANT_MAX_DATA_SIZE
        )));
    }

    if frame.len() < FRAME_OVERHEAD + length {
        return Err(AntChirpError::MalformedFrame(format!(
            "Frame too short: expected {} bytes, got {}",
            FRAME_OVERHEAD + length,
            frame.len()
        )));
    }

    let end = 3 + length;
    let received = frame[end];
    let calculated = xor_checksum(&frame[..end]);
    if calculated != received {
        return Err(AntChirpError::MalformedFrame(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated, received
        )));
    }

    AntMessage::new(frame[2], frame[3..end].to_vec())
}

/// Pull the next frame out of a receive buffer
///
/// Bytes before the next sync byte are discarded. A corrupt frame consumes
/// only its sync byte so decoding can resynchronise on whatever follows.
///
/// # Returns
///
/// * `None` - Buffer holds no complete frame yet
/// * `Some(Ok(message))` - A frame was decoded and removed from the buffer
/// * `Some(Err(_))` - A corrupt frame was skipped
pub fn extract_frame(buffer: &mut BytesMut) -> Option<Result<AntMessage>> {
    match buffer.iter().position(|&byte| byte == ANT_SYNC_BYTE) {
        Some(start) => buffer.advance(start),
        None => {
            buffer.clear();
            return None;
        }
    }

    if buffer.len() < 2 {
        return None;
    }

    let length = buffer[1] as usize;
    if length > ANT_MAX_DATA_SIZE {
        buffer.advance(1);
        return Some(Err(AntChirpError::MalformedFrame(format!(
            "Length {} exceeds maximum {}",
            length, ANT_MAX_DATA_SIZE
        ))));
    }

    let total = FRAME_OVERHEAD + length;
    if buffer.len() < total {
        return None;
    }

    match decode_frame(&buffer[..total]) {
        Ok(message) => {
            buffer.advance(total);
            Some(Ok(message))
        }
        Err(e) => {
            buffer.advance(1);
            Some(Err(e))
        }
    }
}
