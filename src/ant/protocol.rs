//! # ANT Protocol Constants and Types
//!
//! Message identifiers, channel event codes and the message container used on
//! both sides of the radio interface.

use crate::error::{AntChirpError, Result};

/// ANT serial sync byte (always 0xA4)
pub const ANT_SYNC_BYTE: u8 = 0xA4;

/// Maximum data length carried by a single message
pub const ANT_MAX_DATA_SIZE: usize = 17;

/// Size of a broadcast/acknowledged data payload (excluding channel number)
pub const ANT_PAYLOAD_SIZE: usize = 8;

// Configuration messages
pub const MESG_UNASSIGN_CHANNEL_ID: u8 = 0x41;
pub const MESG_ASSIGN_CHANNEL_ID: u8 = 0x42;
pub const MESG_CHANNEL_MESG_PERIOD_ID: u8 = 0x43;
pub const MESG_CHANNEL_SEARCH_TIMEOUT_ID: u8 = 0x44;
pub const MESG_CHANNEL_RADIO_FREQ_ID: u8 = 0x45;
pub const MESG_NETWORK_KEY_ID: u8 = 0x46;
pub const MESG_SET_LP_SEARCH_TIMEOUT_ID: u8 = 0x63;
pub const MESG_PROX_SEARCH_CONFIG_ID: u8 = 0x71;
pub const MESG_CONFIG_EVENT_BUFFER_ID: u8 = 0x74;

// Control messages
pub const MESG_SYSTEM_RESET_ID: u8 = 0x4A;
pub const MESG_OPEN_CHANNEL_ID: u8 = 0x4B;
pub const MESG_CLOSE_CHANNEL_ID: u8 = 0x4C;
pub const MESG_REQUEST_ID: u8 = 0x4D;

// Data messages
pub const MESG_BROADCAST_DATA_ID: u8 = 0x4E;
pub const MESG_ACKNOWLEDGED_DATA_ID: u8 = 0x4F;
pub const MESG_BURST_DATA_ID: u8 = 0x50;
pub const MESG_EXT_BROADCAST_DATA_ID: u8 = 0x5D;
pub const MESG_EXT_ACKNOWLEDGED_DATA_ID: u8 = 0x5E;
pub const MESG_EXT_BURST_DATA_ID: u8 = 0x5F;

// Channel events and requested responses
pub const MESG_RESPONSE_EVENT_ID: u8 = 0x40;
pub const MESG_CHANNEL_ID_ID: u8 = 0x51;
pub const MESG_CHANNEL_STATUS_ID: u8 = 0x52;
pub const MESG_VERSION_ID: u8 = 0x3E;
pub const MESG_CAPABILITIES_ID: u8 = 0x54;
pub const MESG_GET_SERIAL_NUM_ID: u8 = 0x61;
pub const MESG_STARTUP_MESG_ID: u8 = 0x6F;

/// Message id field value of a channel response that carries an RF event
pub const MESG_EVENT_ID: u8 = 0x01;

// Response / event codes
pub const RESPONSE_NO_ERROR: u8 = 0x00;
pub const EVENT_RX_SEARCH_TIMEOUT: u8 = 0x01;
pub const EVENT_RX_FAIL: u8 = 0x02;
pub const EVENT_TX: u8 = 0x03;
pub const EVENT_TRANSFER_RX_FAILED: u8 = 0x04;
pub const EVENT_TRANSFER_TX_COMPLETED: u8 = 0x05;
pub const EVENT_TRANSFER_TX_FAILED: u8 = 0x06;
pub const EVENT_CHANNEL_CLOSED: u8 = 0x07;
pub const EVENT_RX_FAIL_GO_TO_SEARCH: u8 = 0x08;

/// Channel type for a receive-only (slave) channel
pub const PARAMETER_RX_NOT_TX: u8 = 0x00;

/// ANT+ managed network number
pub const ANT_PLUS_NETWORK: u8 = 0x01;

/// A single ANT message: identifier plus data window
///
/// For broadcast, acknowledged, channel-id and channel-response messages the
/// first data byte is the channel number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntMessage {
    /// Message identifier
    pub id: u8,

    /// Data window (at most 17 bytes)
    pub data: Vec<u8>,
}

impl AntMessage {
    /// Create a new ANT message
    ///
    /// # Errors
    ///
    /// Returns error if data exceeds ANT_MAX_DATA_SIZE (17 bytes)
    pub fn new(id: u8, data: Vec<u8>) -> Result<Self> {
        if data.len() > ANT_MAX_DATA_SIZE {
            return Err(AntChirpError::MalformedFrame(format!(
                "Data size {} exceeds maximum {}",
                data.len(),
                ANT_MAX_DATA_SIZE
            )));
        }

        Ok(Self { id, data })
    }

    /// Length field value (data bytes only)
    ///
    /// Cannot overflow since data is validated to be ≤ 17 bytes
    pub fn length(&self) -> u8 {
        self.data.len() as u8
    }

    /// Channel number carried in data byte 0, if any
    pub fn channel(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Whether this message carries broadcast or acknowledged channel data
    pub fn is_channel_data(&self) -> bool {
        matches!(self.id, MESG_BROADCAST_DATA_ID | MESG_ACKNOWLEDGED_DATA_ID)
    }
}
