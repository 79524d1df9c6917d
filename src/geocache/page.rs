//! # Geocache Page Decoder
//!
//! Interprets the data window of a broadcast or acknowledged geocache
//! message. The window is laid out as:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | Channel number |
//! | 1 | Page number |
//! | 2-8 | Page bytes |
//!
//! | Page | Content |
//! |------|---------|
//! | 0 | ID: 9 packed 6-bit characters |
//! | 1 | PIN: reserved, PIN (i32 LE), total page count, reserved |
//! | 2-31 | Programmable field: field id, 6 payload bytes |
//! | 32 | Authentication |

use crate::ant::codec::{decode_packed6, read_le16, read_le32};
use crate::error::{AntChirpError, Result};

pub const GEO_PAGE_ID: u8 = 0;
pub const GEO_PAGE_PIN: u8 = 1;
pub const GEO_PAGE_PROG_MIN: u8 = 2;
pub const GEO_PAGE_PROG_MAX: u8 = 31;
pub const GEO_PAGE_AUTH: u8 = 32;

pub const GEO_PROG_LATITUDE: u8 = 0;
pub const GEO_PROG_LONGITUDE: u8 = 1;
pub const GEO_PROG_HINT: u8 = 2;
pub const GEO_PROG_LOGGED_VISITS: u8 = 4;

/// Channel + page number + 7 page bytes
pub const GEO_WINDOW_SIZE: usize = 9;

/// Characters in a geocache identifier
pub const GEO_ID_LENGTH: usize = 9;

/// Payload bytes of a programmable field page
pub const GEO_FIELD_PAYLOAD_SIZE: usize = 6;

/// Typed content of a programmable field page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammableField {
    /// Latitude in semicircles
    Latitude(i32),

    /// Longitude in semicircles
    Longitude(i32),

    /// One fragment of the hint text
    Hint(String),

    /// Visit log summary
    LoggedVisits {
        /// Timestamp of the most recent visit
        last_visit: u32,
        /// Number of logged visits
        count: u16,
    },

    /// Field id this decoder does not interpret
    Other {
        field_id: u8,
        payload: [u8; GEO_FIELD_PAYLOAD_SIZE],
    },
}

impl ProgrammableField {
    fn decode(field_id: u8, payload: [u8; GEO_FIELD_PAYLOAD_SIZE]) -> Result<Self> {
        let field = match field_id {
            GEO_PROG_LATITUDE => ProgrammableField::Latitude(read_le32(&payload, 0)?),
            GEO_PROG_LONGITUDE => ProgrammableField::Longitude(read_le32(&payload, 0)?),
            GEO_PROG_HINT => {
                let text = String::from_utf8_lossy(&payload);
                ProgrammableField::Hint(text.trim_end_matches('\0').to_string())
            }
            GEO_PROG_LOGGED_VISITS => ProgrammableField::LoggedVisits {
                last_visit: read_le32(&payload, 0)? as u32,
                count: read_le16(&payload, 4)?,
            },
            _ => ProgrammableField::Other { field_id, payload },
        };
        Ok(field)
    }

    /// Field id byte this field was decoded from
    pub fn field_id(&self) -> u8 {
        match self {
            ProgrammableField::Latitude(_) => GEO_PROG_LATITUDE,
            ProgrammableField::Longitude(_) => GEO_PROG_LONGITUDE,
            ProgrammableField::Hint(_) => GEO_PROG_HINT,
            ProgrammableField::LoggedVisits { .. } => GEO_PROG_LOGGED_VISITS,
            ProgrammableField::Other { field_id, .. } => *field_id,
        }
    }
}

/// A decoded geocache data page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Id {
        id: String,
    },
    Pin {
        pin: i32,
        total_pages: u8,
    },
    ProgrammableField {
        page: u8,
        field: ProgrammableField,
    },
    Authentication {
        payload: [u8; 7],
    },
    Unknown {
        page: u8,
    },
}

impl Page {
    /// Decode a geocache data window
    ///
    /// # Arguments
    ///
    /// * `window` - Data window of a broadcast/acknowledged message
    ///   (channel, page number, 7 page bytes)
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if the window is shorter than 9 bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use antchirp::geocache::page::Page;
    ///
    /// let window = [0x00, 0x01, 0xFF, 0x78, 0x56, 0x34, 0x12, 0x05, 0xFF];
    /// let page = Page::decode(&window)?;
    /// assert_eq!(page, Page::Pin { pin: 0x1234_5678, total_pages: 5 });
    /// # Ok::<(), antchirp::error::AntChirpError>(())
    /// ```
    pub fn decode(window: &[u8]) -> Result<Self> {
        if window.len() < GEO_WINDOW_SIZE {
            return Err(AntChirpError::MalformedFrame(format!(
                "Geocache window too short: {} bytes",
                window.len()
            )));
        }

        let page = window[1];
        let bytes = &window[2..GEO_WINDOW_SIZE];

        let decoded = match page {
            GEO_PAGE_ID => Page::Id {
                id: decode_packed6(bytes, GEO_ID_LENGTH)?,
            },
            GEO_PAGE_PIN => Page::Pin {
                pin: read_le32(bytes, 1)?,
                total_pages: bytes[5],
            },
            GEO_PAGE_PROG_MIN..=GEO_PAGE_PROG_MAX => {
                let mut payload = [0u8; GEO_FIELD_PAYLOAD_SIZE];
                payload.copy_from_slice(&bytes[1..]);
                Page::ProgrammableField {
                    page,
                    field: ProgrammableField::decode(bytes[0], payload)?,
                }
            }
            GEO_PAGE_AUTH => {
                let mut payload = [0u8; 7];
                payload.copy_from_slice(bytes);
                Page::Authentication { payload }
            }
            _ => Page::Unknown { page },
        };

        Ok(decoded)
    }

    /// Page number this page was decoded from
    pub fn number(&self) -> u8 {
        match self {
            Page::Id { .. } => GEO_PAGE_ID,
            Page::Pin { .. } => GEO_PAGE_PIN,
            Page::ProgrammableField { page, .. } => *page,
            Page::Authentication { .. } => GEO_PAGE_AUTH,
            Page::Unknown { page } => *page,
        }
    }
}
