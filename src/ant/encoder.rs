//! # ANT Message Encoder
//!
//! Encodes radio commands into ANT serial frames.

use super::checksum::xor_checksum;
use super::protocol::*;
use crate::radio::Command;

/// Event buffering interval disabled (buffer by size only)
const EVENT_BUFFER_NO_INTERVAL: u16 = 0xFFFF;

/// Event buffer config: buffer all events
const EVENT_BUFFER_CONFIG_ALL: u8 = 0x01;

/// Event buffer config: buffering off
const EVENT_BUFFER_CONFIG_OFF: u8 = 0x00;

/// Encode an ANT message into a complete serial frame
///
/// # Returns
///
/// * `Vec<u8>` - Sync + Length + Message ID + Data + Checksum
///
/// # Examples
///
/// ```
/// use antchirp::ant::encoder::encode_frame;
/// use antchirp::ant::protocol::{AntMessage, MESG_OPEN_CHANNEL_ID};
///
/// let message = AntMessage::new(MESG_OPEN_CHANNEL_ID, vec![0x00])?;
/// assert_eq!(encode_frame(&message), vec![0xA4, 0x01, 0x4B, 0x00, 0xEE]);
/// # Ok::<(), antchirp::error::AntChirpError>(())
/// ```
pub fn encode_frame(message: &AntMessage) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + message.data.len());
    frame.push(ANT_SYNC_BYTE);
    frame.push(message.length());
    frame.push(message.id);
    frame.extend_from_slice(&message.data);

    let checksum = xor_checksum(&frame);
    frame.push(checksum);

    frame
}

/// Translate a radio command into its ANT message
///
/// # Returns
///
/// * `Some(AntMessage)` - Wire form of the command
/// * `None` - Host-level command with no wire form (enable, disable, claim)
pub fn encode_command(command: &Command) -> Option<AntMessage> {
    let (id, data) = match *command {
        Command::AssignChannel {
            channel,
            channel_type,
            network,
        } => (MESG_ASSIGN_CHANNEL_ID, vec![channel, channel_type, network]),
        Command::SetChannelId {
            channel,
            device_number,
            device_type,
            transmission_type,
        } => {
            let [lo, hi] = device_number.to_le_bytes();
            (
                MESG_CHANNEL_ID_ID,
                vec![channel, lo, hi, device_type, transmission_type],
            )
        }
        Command::SetChannelPeriod { channel, period } => {
            let [lo, hi] = period.to_le_bytes();
            (MESG_CHANNEL_MESG_PERIOD_ID, vec![channel, lo, hi])
        }
        Command::SetChannelRfFrequency { channel, frequency } => {
            (MESG_CHANNEL_RADIO_FREQ_ID, vec![channel, frequency])
        }
        Command::SetSearchTimeout { channel, timeout } => {
            (MESG_CHANNEL_SEARCH_TIMEOUT_ID, vec![channel, timeout])
        }
        Command::SetLowPrioritySearchTimeout { channel, timeout } => {
            (MESG_SET_LP_SEARCH_TIMEOUT_ID, vec![channel, timeout])
        }
        Command::SetProximitySearch { channel, bin } => {
            (MESG_PROX_SEARCH_CONFIG_ID, vec![channel, bin])
        }
        Command::OpenChannel { channel } => (MESG_OPEN_CHANNEL_ID, vec![channel]),
        Command::CloseChannel { channel } => (MESG_CLOSE_CHANNEL_ID, vec![channel]),
        Command::UnassignChannel { channel } => (MESG_UNASSIGN_CHANNEL_ID, vec![channel]),
        Command::SendAcknowledgedData { channel, data } => {
            let mut payload = Vec::with_capacity(1 + ANT_PAYLOAD_SIZE);
            payload.push(channel);
            payload.extend_from_slice(&data);
            (MESG_ACKNOWLEDGED_DATA_ID, payload)
        }
        Command::RequestMessage {
            channel,
            message_id,
        } => (MESG_REQUEST_ID, vec![channel, message_id]),
        Command::SetNetworkKey { network, key } => {
            let mut payload = Vec::with_capacity(9);
            payload.push(network);
            payload.extend_from_slice(&key);
            (MESG_NETWORK_KEY_ID, payload)
        }
        Command::ConfigureEventBuffering { threshold } => {
            let [size_lo, size_hi] = threshold.to_le_bytes();
            let [time_lo, time_hi] = EVENT_BUFFER_NO_INTERVAL.to_le_bytes();
            (
                MESG_CONFIG_EVENT_BUFFER_ID,
                vec![0x00, EVENT_BUFFER_CONFIG_ALL, size_lo, size_hi, time_lo, time_hi],
            )
        }
        Command::DisableEventBuffering => (
            MESG_CONFIG_EVENT_BUFFER_ID,
            vec![0x00, EVENT_BUFFER_CONFIG_OFF, 0x00, 0x00, 0x00, 0x00],
        ),
        Command::ResetSystem => (MESG_SYSTEM_RESET_ID, vec![0x00]),
        Command::Enable | Command::Disable | Command::ClaimInterface => return None,
    };

    // Every payload above is at most 9 data bytes
    Some(AntMessage { id, data })
}
