//! # Geocache Module
//!
//! ANT+ geocache device profile.
//!
//! This module handles:
//! - Decoding geocache data pages (ID, PIN, programmable fields, authentication)
//! - Folding decoded pages into a device record
//! - Requesting the remaining pages of a multi-page record

pub mod page;
pub mod record;
pub mod request;
