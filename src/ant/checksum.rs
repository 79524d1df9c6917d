//! # ANT Message Checksum
//!
//! XOR checksum over every byte of a serial message from the sync byte
//! through the last data byte.

/// Calculate the ANT checksum
///
/// # Arguments
///
/// * `data` - Sync + Length + Message ID + Data
///
/// # Examples
///
/// ```
/// use antchirp::ant::checksum::xor_checksum;
///
/// // Reset command: sync, length 1, id 0x4A, filler 0x00
/// assert_eq!(xor_checksum(&[0xA4, 0x01, 0x4A, 0x00]), 0xEF);
/// ```
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc ^ byte)
}
