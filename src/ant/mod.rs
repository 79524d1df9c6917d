//! # ANT Protocol Module
//!
//! Implementation of the ANT serial message protocol.
//!
//! This module handles:
//! - Message identifiers and channel event codes
//! - Command encoding into serial frames
//! - Frame decoding and stream resynchronisation
//! - XOR checksum calculation
//! - Byte-field helpers (little-endian fields, packed 6-bit ASCII, hex dumps)

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
pub mod codec;
