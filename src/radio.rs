//! # Radio Collaborator Interfaces
//!
//! The channel manager talks to the outside world through three seams:
//!
//! - [`RadioCommandSink`]: commands going out to the radio
//! - [`RadioEventHandler`]: messages and device events coming in
//! - [`ManagerCallbacks`]: notifications to whoever presents the state
//!
//! All calls are synchronous. The manager is driven from a single event
//! context, so none of these traits require `Sync`.

use crate::ant::protocol::AntMessage;
use crate::channel::session::DeviceStatus;
use crate::channel::ChannelState;
use crate::error::Result;
use crate::geocache::record::DeviceRecord;

/// Outbound radio command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AssignChannel {
        channel: u8,
        channel_type: u8,
        network: u8,
    },
    SetChannelId {
        channel: u8,
        device_number: u16,
        device_type: u8,
        transmission_type: u8,
    },
    SetChannelPeriod {
        channel: u8,
        period: u16,
    },
    SetChannelRfFrequency {
        channel: u8,
        frequency: u8,
    },
    SetSearchTimeout {
        channel: u8,
        timeout: u8,
    },
    SetLowPrioritySearchTimeout {
        channel: u8,
        timeout: u8,
    },
    SetProximitySearch {
        channel: u8,
        bin: u8,
    },
    OpenChannel {
        channel: u8,
    },
    CloseChannel {
        channel: u8,
    },
    UnassignChannel {
        channel: u8,
    },
    SendAcknowledgedData {
        channel: u8,
        data: [u8; 8],
    },
    RequestMessage {
        channel: u8,
        message_id: u8,
    },
    SetNetworkKey {
        network: u8,
        key: [u8; 8],
    },
    ConfigureEventBuffering {
        threshold: u16,
    },
    DisableEventBuffering,
    ResetSystem,
    Enable,
    Disable,
    ClaimInterface,
}

/// Device-wide radio notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Enabling,
    Enabled,
    Disabling,
    Disabled,
    /// Radio finished a system reset (by us or by someone else)
    Reset,
    /// Ownership of the radio interface changed
    InterfaceClaimed { claimed: bool },
}

/// Anything the event source can deliver to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    Message(AntMessage),
    Device(DeviceEvent),
}

/// Sink for outbound radio commands
///
/// Each command is fire-and-forget: completion is observed later as a
/// channel response on the event source.
#[cfg_attr(test, mockall::automock)]
pub trait RadioCommandSink {
    /// Issue a command
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the radio rejected the command or is unavailable
    fn send(&mut self, command: Command) -> Result<()>;
}

/// Inbound side of the radio, implemented by the channel manager
pub trait RadioEventHandler {
    fn handle_event(&mut self, event: RadioEvent);
}

/// Notifications fired after every state or data mutation
#[cfg_attr(test, mockall::automock)]
pub trait ManagerCallbacks {
    /// A radio command failed
    fn on_error(&mut self);

    /// Device-level status changed
    fn on_device_state_changed(&mut self, status: DeviceStatus);

    /// A channel moved to a new state
    fn on_channel_state_changed(&mut self, channel: u8, state: ChannelState);

    /// Decoded data for a channel changed
    fn on_channel_data_changed(&mut self, channel: u8, record: &DeviceRecord);
}
