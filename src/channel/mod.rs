//! # Channel Module
//!
//! Per-channel state and configuration for the channel manager.
//!
//! This module handles:
//! - The channel lifecycle states reported to the UI
//! - The configuration latched when a channel is opened
//! - The ordered setup chain that brings a channel from unassigned to open
//! - Device-wide radio session flags (see [`session`])

pub mod session;

use serde::Serialize;
use std::fmt;

use crate::ant::protocol::*;

/// Channel number of the geocache channel
pub const GEO_CHANNEL: u8 = 0;

/// ANT+ device type for a geocache
pub const GEO_DEVICE_TYPE: u8 = 0x13;

/// ANT+ channel period for a geocache (32768 / 8192 = 4 Hz)
pub const GEO_PERIOD: u16 = 8192;

/// RF frequency offset from 2400 MHz (2457 MHz, ANT+)
pub const ANT_PLUS_FREQUENCY: u8 = 57;

/// Device number that matches any device during search
pub const WILDCARD_DEVICE_NUMBER: u16 = 0;

/// High priority search timeout (0 disables high priority search)
pub const HIGH_PRIORITY_SEARCH_TIMEOUT: u8 = 0;

/// Low priority search timeout in 2.5 s units (30 s)
pub const LOW_PRIORITY_SEARCH_TIMEOUT: u8 = 12;

/// Possible states of a device channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelState {
    /// Channel was explicitly closed or has not been opened
    Closed,

    /// Open requested, configuration in progress or waiting for a reset
    PendingOpen,

    /// Channel is open but no data has been received yet
    Searching,

    /// Channel is open and most recently received status data
    TrackingStatus,

    /// Channel is open and most recently received measurement data
    TrackingData,

    /// Channel closed as the result of a search timeout
    Offline,
}

impl ChannelState {
    /// Whether the channel is open or opening
    pub fn is_open(self) -> bool {
        !matches!(self, ChannelState::Closed | ChannelState::Offline)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChannelState::Closed => "closed",
            ChannelState::PendingOpen => "pending open",
            ChannelState::Searching => "searching",
            ChannelState::TrackingStatus => "tracking status",
            ChannelState::TrackingData => "tracking data",
            ChannelState::Offline => "offline",
        };
        f.write_str(text)
    }
}

/// One step of the channel setup chain
///
/// Each step is entered by sending its command and left when the radio
/// confirms that command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    AssignChannel,
    ChannelId,
    Period,
    Frequency,
    SearchTimeout,
    LowPrioritySearchTimeout,
    ProximitySearch,
    OpenChannel,
}

impl SetupStep {
    /// Message id the radio echoes back when confirming this step
    pub fn message_id(self) -> u8 {
        match self {
            SetupStep::AssignChannel => MESG_ASSIGN_CHANNEL_ID,
            SetupStep::ChannelId => MESG_CHANNEL_ID_ID,
            SetupStep::Period => MESG_CHANNEL_MESG_PERIOD_ID,
            SetupStep::Frequency => MESG_CHANNEL_RADIO_FREQ_ID,
            SetupStep::SearchTimeout => MESG_CHANNEL_SEARCH_TIMEOUT_ID,
            SetupStep::LowPrioritySearchTimeout => MESG_SET_LP_SEARCH_TIMEOUT_ID,
            SetupStep::ProximitySearch => MESG_PROX_SEARCH_CONFIG_ID,
            SetupStep::OpenChannel => MESG_OPEN_CHANNEL_ID,
        }
    }

    /// Step that follows a confirmed step, `None` once the channel is open
    ///
    /// Proximity search is only configured for wildcard searches.
    pub fn next(self, wildcard: bool) -> Option<SetupStep> {
        match self {
            SetupStep::AssignChannel => Some(SetupStep::ChannelId),
            SetupStep::ChannelId => Some(SetupStep::Period),
            SetupStep::Period => Some(SetupStep::Frequency),
            SetupStep::Frequency => Some(SetupStep::SearchTimeout),
            SetupStep::SearchTimeout => Some(SetupStep::LowPrioritySearchTimeout),
            SetupStep::LowPrioritySearchTimeout if wildcard => Some(SetupStep::ProximitySearch),
            SetupStep::LowPrioritySearchTimeout => Some(SetupStep::OpenChannel),
            SetupStep::ProximitySearch => Some(SetupStep::OpenChannel),
            SetupStep::OpenChannel => None,
        }
    }
}

/// Radio configuration of a single channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Device number to pair with (0 = wildcard)
    pub device_number: u16,
    pub device_type: u8,
    pub transmission_type: u8,
    /// Message period in 1/32768 s
    pub period: u16,
    /// RF frequency offset from 2400 MHz
    pub frequency: u8,
    /// Proximity search bin
    pub proximity_bin: u8,
    /// Setup chain in flight
    pub initializing: bool,
    /// Teardown chain in flight
    pub deinitializing: bool,
    /// Setup step whose confirmation is awaited while initializing
    pub awaiting: Option<SetupStep>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            device_number: WILDCARD_DEVICE_NUMBER,
            device_type: 0,
            transmission_type: 0,
            period: 0,
            frequency: ANT_PLUS_FREQUENCY,
            proximity_bin: 0,
            initializing: false,
            deinitializing: false,
            awaiting: None,
        }
    }
}

impl ChannelConfig {
    /// Whether the channel searches for any device
    pub fn is_wildcard(&self) -> bool {
        self.device_number == WILDCARD_DEVICE_NUMBER
    }

    /// Enter the setup chain
    pub fn begin_setup(&mut self) {
        self.initializing = true;
        self.deinitializing = false;
        self.awaiting = Some(SetupStep::AssignChannel);
    }

    /// Enter the teardown chain, abandoning any setup in flight
    pub fn begin_teardown(&mut self) {
        self.initializing = false;
        self.deinitializing = true;
        self.awaiting = None;
    }

    /// Drop out of both chains
    pub fn settle(&mut self) {
        self.initializing = false;
        self.deinitializing = false;
        self.awaiting = None;
    }
}

/// A registered channel: its lifecycle state plus its configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub state: ChannelState,
    pub config: ChannelConfig,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            state: ChannelState::Closed,
            config: ChannelConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_constants() {
        assert_eq!(GEO_CHANNEL, 0);
        assert_eq!(GEO_DEVICE_TYPE, 0x13);
        assert_eq!(GEO_PERIOD, 8192);
        assert_eq!(ANT_PLUS_FREQUENCY, 57);
        assert_eq!(LOW_PRIORITY_SEARCH_TIMEOUT, 12);
    }

    #[test]
    fn test_channel_state_is_open() {
        assert!(!ChannelState::Closed.is_open());
        assert!(!ChannelState::Offline.is_open());
        assert!(ChannelState::PendingOpen.is_open());
        assert!(ChannelState::Searching.is_open());
        assert!(ChannelState::TrackingData.is_open());
    }

    #[test]
    fn test_setup_chain_with_wildcard() {
        let mut step = SetupStep::AssignChannel;
        let mut chain = vec![step];
        while let Some(next) = step.next(true) {
            chain.push(next);
            step = next;
        }

        assert_eq!(chain.len(), 8);
        assert_eq!(chain[6], SetupStep::ProximitySearch);
        assert_eq!(chain[7], SetupStep::OpenChannel);
    }

    #[test]
    fn test_setup_chain_with_paired_device_skips_proximity() {
        assert_eq!(
            SetupStep::LowPrioritySearchTimeout.next(false),
            Some(SetupStep::OpenChannel)
        );
        assert_eq!(SetupStep::OpenChannel.next(false), None);
    }

    #[test]
    fn test_setup_step_message_ids() {
        assert_eq!(SetupStep::AssignChannel.message_id(), 0x42);
        assert_eq!(SetupStep::ChannelId.message_id(), 0x51);
        assert_eq!(SetupStep::LowPrioritySearchTimeout.message_id(), 0x63);
        assert_eq!(SetupStep::ProximitySearch.message_id(), 0x71);
        assert_eq!(SetupStep::OpenChannel.message_id(), 0x4B);
    }

    #[test]
    fn test_setup_and_teardown_flags_are_exclusive() {
        let mut config = ChannelConfig::default();

        config.begin_setup();
        assert!(config.initializing && !config.deinitializing);
        assert_eq!(config.awaiting, Some(SetupStep::AssignChannel));

        config.begin_teardown();
        assert!(!config.initializing && config.deinitializing);
        assert_eq!(config.awaiting, None);

        config.settle();
        assert!(!config.initializing && !config.deinitializing);
    }
}
