//! # Error Types
//!
//! Custom error types for ANTChirp using `thiserror`.

use thiserror::Error;

/// Main error type for ANTChirp
#[derive(Debug, Error)]
pub enum AntChirpError {
    /// Radio command rejected or interface unavailable
    #[error("Radio transport error: {0}")]
    Transport(String),

    /// Non-zero status byte in a channel response
    #[error("Protocol error: code 0x{code:02X} on message 0x{message_id:02X} (channel {channel})")]
    Protocol {
        channel: u8,
        message_id: u8,
        code: u8,
    },

    /// Inbound frame could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Byte window too short for the requested field
    #[error("Field out of range: need {needed} bytes at offset {offset}, have {len}")]
    OutOfRange {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// Channel number not registered with the manager
    #[error("Unknown channel: {0}")]
    UnknownChannel(u8),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Configuration write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No usable serial device found
    #[error("No ANT USB device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ANTChirp
pub type Result<T> = std::result::Result<T, AntChirpError>;
