//! # Byte-Field Codec
//!
//! Helpers for pulling typed fields out of ANT data windows.
//!
//! ## Packed 6-bit ASCII
//!
//! Geocache identifiers are transmitted as a bitstream of 6-bit characters,
//! MSB-first within each byte. Character `i` occupies stream bits
//! `[6i, 6i + 6)`; its value `v` maps to the ASCII byte `v + 0x20`, giving the
//! printable range `' '..='_'`.
//!
//! ```text
//! Byte 0: c0[5:0] c1[5:4]
//! Byte 1: c1[3:0] c2[5:2]
//! Byte 2: c2[1:0] c3[5:0]
//! ...
//! ```

use crate::error::{AntChirpError, Result};

/// Offset added to each 6-bit value to reach printable ASCII
const PACKED6_ASCII_OFFSET: u8 = 0x20;

fn ensure_window(bytes: &[u8], offset: usize, needed: usize) -> Result<()> {
    if offset.checked_add(needed).map_or(true, |end| end > bytes.len()) {
        return Err(AntChirpError::OutOfRange {
            offset,
            needed,
            len: bytes.len(),
        });
    }
    Ok(())
}

/// Read a little-endian signed 32-bit integer at `offset`
///
/// # Errors
///
/// Returns `OutOfRange` if fewer than 4 bytes remain from `offset`
///
/// # Examples
///
/// ```
/// use antchirp::ant::codec::read_le32;
///
/// let bytes = [0xFF, 0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_le32(&bytes, 1).unwrap(), 0x1234_5678);
/// ```
pub fn read_le32(bytes: &[u8], offset: usize) -> Result<i32> {
    ensure_window(bytes, offset, 4)?;
    Ok(i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]))
}

/// Read a little-endian unsigned 16-bit integer at `offset`
///
/// # Errors
///
/// Returns `OutOfRange` if fewer than 2 bytes remain from `offset`
pub fn read_le16(bytes: &[u8], offset: usize) -> Result<u16> {
    ensure_window(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

/// Decode `char_count` packed 6-bit characters
///
/// For character `i` the left byte is `bytes[6i / 8]`, the right byte is
/// `bytes[(6i + 5) / 8]`, `left_shift = 2i mod 8` and
/// `right_shift = 6 - left_shift`. The value is
/// `((left & (0x3F >> right_shift)) << right_shift) | (right >> (2 + left_shift))`.
///
/// # Errors
///
/// Returns `OutOfRange` if `bytes` is too short to hold `char_count` characters
///
/// # Examples
///
/// ```
/// use antchirp::ant::codec::decode_packed6;
///
/// // "AB" = 0x21, 0x22 -> 100001 100010 -> 0x86 0x20
/// assert_eq!(decode_packed6(&[0x86, 0x20], 2).unwrap(), "AB");
/// ```
pub fn decode_packed6(bytes: &[u8], char_count: usize) -> Result<String> {
    if char_count == 0 {
        return Ok(String::new());
    }

    let needed = (6 * (char_count - 1) + 5) / 8 + 1;
    ensure_window(bytes, 0, needed)?;

    let mut text = String::with_capacity(char_count);
    for i in 0..char_count {
        let bit = 6 * i;
        // Widen before shifting: at left_shift = 6 the right byte shifts by 8
        let left = u32::from(bytes[bit / 8]);
        let right = u32::from(bytes[(bit + 5) / 8]);
        let left_shift = (2 * i) % 8;
        let right_shift = 6 - left_shift;

        let left_bits = (left & (0x3F >> right_shift)) << right_shift;
        let right_bits = right >> (2 + left_shift);
        let value = ((left_bits | right_bits) & 0x3F) as u8;

        text.push(char::from(value + PACKED6_ASCII_OFFSET));
    }

    Ok(text)
}

/// Format bytes as `[XX]` uppercase hex pairs for diagnostics
///
/// # Examples
///
/// ```
/// use antchirp::ant::codec::hex_dump;
///
/// assert_eq!(hex_dump(&[0xA4, 0x01]), "[A4][01]");
/// assert_eq!(hex_dump(&[]), "");
/// ```
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("[{:02X}]", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of `decode_packed6`, packing characters MSB-first
    fn pack6(text: &str) -> Vec<u8> {
        let bits = text.len() * 6;
        let mut bytes = vec![0u8; (bits + 7) / 8];
        for (i, ch) in text.bytes().enumerate() {
            let value = ch - PACKED6_ASCII_OFFSET;
            for bit in 0..6 {
                if (value >> (5 - bit)) & 1 == 1 {
                    let pos = 6 * i + bit;
                    bytes[pos / 8] |= 0x80 >> (pos % 8);
                }
            }
        }
        bytes
    }

    #[test]
    fn test_read_le32() {
        let bytes = [0x78, 0x56, 0x34, 0x12];
        assert_eq!(read_le32(&bytes, 0).unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_read_le32_negative() {
        let bytes = [0xFE, 0xFF, 0xFF, 0xFF];
        assert_eq!(read_le32(&bytes, 0).unwrap(), -2);
    }

    #[test]
    fn test_read_le32_out_of_range() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05];
        let err = read_le32(&bytes, 2).unwrap_err();
        match err {
            AntChirpError::OutOfRange { offset, needed, len } => {
                assert_eq!(offset, 2);
                assert_eq!(needed, 4);
                assert_eq!(len, 5);
            }
            other => panic!("Expected OutOfRange, got: {:?}", other),
        }
    }

    #[test]
    fn test_read_le32_offset_overflow() {
        assert!(read_le32(&[0u8; 4], usize::MAX).is_err());
    }

    #[test]
    fn test_read_le16() {
        assert_eq!(read_le16(&[0x00, 0x34, 0x12], 1).unwrap(), 0x1234);
        assert!(read_le16(&[0x00], 0).is_err());
    }

    #[test]
    fn test_decode_packed6_known_id() {
        let packed = pack6("GC1A2B3C4");
        assert_eq!(packed.len(), 7);
        assert_eq!(decode_packed6(&packed, 9).unwrap(), "GC1A2B3C4");
    }

    #[test]
    fn test_decode_packed6_matches_manual_bits() {
        // "AB" -> 0x21 0x22 -> 100001 100010 -> 1000 0110 0010 0000
        assert_eq!(decode_packed6(&[0x86, 0x20], 2).unwrap(), "AB");
    }

    #[test]
    fn test_decode_packed6_byte_boundary_characters() {
        // i = 3 ends exactly on a byte boundary (left_shift = 6, right shift by 8)
        // i = 4 restarts at a byte boundary (left_shift = 0)
        // i = 8 is the last character of a 7-byte ID window
        let text = "_ _ _ _ _";
        let decoded = decode_packed6(&pack6(text), 9).unwrap();
        assert_eq!(decoded, text);

        let text = "ABCDEFGHI";
        let decoded = decode_packed6(&pack6(text), 9).unwrap();
        assert_eq!(&decoded[3..5], "DE");
        assert_eq!(&decoded[8..], "I");
    }

    #[test]
    fn test_decode_packed6_all_values() {
        // Every 6-bit value decodes to its printable ASCII counterpart
        let text: String = (0x20u8..0x60).map(char::from).collect();
        let decoded = decode_packed6(&pack6(&text), text.len()).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_decode_packed6_all_ones() {
        let decoded = decode_packed6(&[0xFF; 7], 9).unwrap();
        assert_eq!(decoded, "_________");
    }

    #[test]
    fn test_decode_packed6_too_short() {
        let result = decode_packed6(&[0x00; 6], 9);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_packed6_zero_chars() {
        assert_eq!(decode_packed6(&[], 0).unwrap(), "");
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0x0F, 0xAB, 0xFF]), "[00][0F][AB][FF]");
    }

    #[test]
    fn test_hex_dump_empty() {
        assert_eq!(hex_dump(&[]), "");
    }
}
