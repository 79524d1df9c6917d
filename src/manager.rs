//! # Channel Manager
//!
//! Drives the geocache channel through its lifecycle and turns inbound radio
//! traffic into device-record updates.
//!
//! ## Setup chain
//!
//! Opening a channel issues one command at a time; each confirmation from the
//! radio triggers the next command:
//!
//! ```text
//! assign -> channel id -> period -> frequency -> search timeout
//!        -> low priority search timeout -> [proximity search] -> open
//! ```
//!
//! Proximity search is only configured for wildcard searches. Only the
//! confirmation of the step currently awaited advances the chain; anything
//! else is ignored. A confirmation carrying an error code stops the chain
//! until the user opens the channel again.
//!
//! ## Teardown chain
//!
//! ```text
//! close -> (channel closed event) -> unassign -> (unassign confirmed)
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use antchirp::channel::GEO_CHANNEL;
//! use antchirp::config::GeocacheConfig;
//! use antchirp::manager::AntManager;
//! # fn demo(sink: impl antchirp::radio::RadioCommandSink,
//! #         callbacks: impl antchirp::radio::ManagerCallbacks) -> antchirp::error::Result<()> {
//! let mut manager = AntManager::new(sink, callbacks, GeocacheConfig::default());
//! manager.open_channel(GEO_CHANNEL, true)?;
//! manager.request_reset();
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::ant::codec::{hex_dump, read_le16};
use crate::ant::protocol::*;
use crate::channel::session::{DeviceStatus, RadioSession};
use crate::channel::*;
use crate::config::GeocacheConfig;
use crate::error::{AntChirpError, Result};
use crate::geocache::page::Page;
use crate::geocache::record::DeviceRecord;
use crate::geocache::request::{follow_up_pages, request_page};
use crate::radio::{Command, DeviceEvent, ManagerCallbacks, RadioCommandSink, RadioEvent, RadioEventHandler};

/// Command that performs a setup step for a channel
fn setup_command(channel: u8, config: &ChannelConfig, step: SetupStep, network: u8) -> Command {
    match step {
        SetupStep::AssignChannel => Command::AssignChannel {
            channel,
            channel_type: PARAMETER_RX_NOT_TX,
            network,
        },
        SetupStep::ChannelId => Command::SetChannelId {
            channel,
            device_number: config.device_number,
            device_type: config.device_type,
            transmission_type: config.transmission_type,
        },
        SetupStep::Period => Command::SetChannelPeriod {
            channel,
            period: config.period,
        },
        SetupStep::Frequency => Command::SetChannelRfFrequency {
            channel,
            frequency: config.frequency,
        },
        SetupStep::SearchTimeout => Command::SetSearchTimeout {
            channel,
            timeout: HIGH_PRIORITY_SEARCH_TIMEOUT,
        },
        SetupStep::LowPrioritySearchTimeout => Command::SetLowPrioritySearchTimeout {
            channel,
            timeout: LOW_PRIORITY_SEARCH_TIMEOUT,
        },
        SetupStep::ProximitySearch => Command::SetProximitySearch {
            channel,
            bin: config.proximity_bin,
        },
        SetupStep::OpenChannel => Command::OpenChannel { channel },
    }
}

/// Owns the radio session, the channel map and the decoded device record
pub struct AntManager<S, C> {
    sink: S,
    callbacks: C,
    session: RadioSession,
    channels: HashMap<u8, Channel>,
    record: DeviceRecord,
    settings: GeocacheConfig,
    network: u8,
    network_key: Option<[u8; 8]>,
}

impl<S, C> AntManager<S, C>
where
    S: RadioCommandSink,
    C: ManagerCallbacks,
{
    /// Create a manager with the geocache channel registered and closed
    pub fn new(sink: S, callbacks: C, settings: GeocacheConfig) -> Self {
        let mut channels = HashMap::new();
        channels.insert(GEO_CHANNEL, Channel::default());

        Self {
            sink,
            callbacks,
            session: RadioSession::new(),
            channels,
            record: DeviceRecord::new(),
            settings,
            network: ANT_PLUS_NETWORK,
            network_key: None,
        }
    }

    /// Network key to load after every reset we trigger
    #[must_use]
    pub fn with_network_key(mut self, network: u8, key: [u8; 8]) -> Self {
        self.network = network;
        self.network_key = Some(key);
        self
    }

    pub fn settings(&self) -> &GeocacheConfig {
        &self.settings
    }

    pub fn set_device_number(&mut self, device_number: u16) {
        self.settings.device_number = device_number;
    }

    pub fn set_proximity_threshold(&mut self, proximity_threshold: u8) {
        self.settings.proximity_threshold = proximity_threshold;
    }

    pub fn set_buffer_threshold(&mut self, buffer_threshold: u16) {
        self.settings.buffer_threshold = buffer_threshold;
    }

    pub fn session(&self) -> &RadioSession {
        &self.session
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.session.status()
    }

    /// Current state of a channel
    ///
    /// # Errors
    ///
    /// Returns `UnknownChannel` if the channel is not registered
    pub fn channel_state(&self, channel: u8) -> Result<ChannelState> {
        Ok(self.channel(channel)?.state)
    }

    /// Current configuration of a channel
    ///
    /// # Errors
    ///
    /// Returns `UnknownChannel` if the channel is not registered
    pub fn channel_config(&self, channel: u8) -> Result<&ChannelConfig> {
        Ok(&self.channel(channel)?.config)
    }

    /// Whether a channel is open or opening
    pub fn is_channel_open(&self, channel: u8) -> bool {
        self.channel(channel).map_or(false, |slot| slot.state.is_open())
    }

    fn channel(&self, channel: u8) -> Result<&Channel> {
        self.channels
            .get(&channel)
            .ok_or(AntChirpError::UnknownChannel(channel))
    }

    fn channel_mut(&mut self, channel: u8) -> Result<&mut Channel> {
        self.channels
            .get_mut(&channel)
            .ok_or(AntChirpError::UnknownChannel(channel))
    }

    /// Move a channel to `state`, notifying only on change
    ///
    /// Returning to `Closed` makes the decoded record stale, so it is reset.
    fn set_state(&mut self, channel: u8, state: ChannelState) {
        let Some(slot) = self.channels.get_mut(&channel) else {
            return;
        };
        if slot.state == state {
            return;
        }

        debug!("Channel {}: {} -> {}", channel, slot.state, state);
        slot.state = state;
        self.callbacks.on_channel_state_changed(channel, state);

        if state == ChannelState::Closed && !self.record.is_empty() {
            self.record.reset();
            self.callbacks.on_channel_data_changed(channel, &self.record);
        }
    }

    fn report_error(&mut self, err: &AntChirpError) {
        error!("ANT radio error: {}", err);
        self.session.errored = true;
        self.callbacks.on_error();
    }

    /// Send a command, reporting failure
    fn send(&mut self, command: Command) -> bool {
        match self.sink.send(command) {
            Ok(()) => true,
            Err(e) => {
                self.report_error(&e);
                false
            }
        }
    }

    /// Force every channel `Closed`; a pending deferred open is dropped too
    fn close_all_channels(&mut self) {
        self.session.deferred_open = false;
        let numbers: Vec<u8> = self.channels.keys().copied().collect();
        for number in numbers {
            if let Some(slot) = self.channels.get_mut(&number) {
                slot.config.settle();
            }
            self.set_state(number, ChannelState::Closed);
        }
    }

    /// Open a channel with the geocache configuration
    ///
    /// # Arguments
    ///
    /// * `channel` - Channel to open
    /// * `deferred` - Wait for the next reset we trigger before configuring
    ///
    /// # Errors
    ///
    /// Returns `UnknownChannel` if the channel is not registered. Transport
    /// failures are reported through `on_error`, not returned.
    pub fn open_channel(&mut self, channel: u8, deferred: bool) -> Result<()> {
        if deferred {
            self.channel(channel)?;
            info!("Opening channel {} after the next reset", channel);
            self.session.deferred_open = true;
            self.set_state(channel, ChannelState::PendingOpen);
            return Ok(());
        }

        let network = self.network;
        let config = ChannelConfig {
            device_number: self.settings.device_number,
            device_type: GEO_DEVICE_TYPE,
            transmission_type: 0,
            period: GEO_PERIOD,
            frequency: ANT_PLUS_FREQUENCY,
            proximity_bin: self.settings.proximity_threshold,
            ..ChannelConfig::default()
        };

        let slot = self.channel_mut(channel)?;
        slot.config = config;
        slot.config.begin_setup();
        let command = setup_command(channel, &slot.config, SetupStep::AssignChannel, network);

        info!(
            "Opening channel {} (device {}, proximity bin {})",
            channel, self.settings.device_number, self.settings.proximity_threshold
        );
        self.set_state(channel, ChannelState::PendingOpen);
        self.send(command);
        Ok(())
    }

    /// Close a channel
    ///
    /// Closing is best-effort: a failed close command is reported and not
    /// retried. Any setup in flight and any deferred open are abandoned.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChannel` if the channel is not registered
    pub fn close_channel(&mut self, channel: u8) -> Result<()> {
        self.channel_mut(channel)?.config.begin_teardown();
        if channel == GEO_CHANNEL {
            self.session.deferred_open = false;
        }
        self.set_state(channel, ChannelState::Closed);

        if let Err(e) = self.sink.send(Command::CloseChannel { channel }) {
            warn!("Could not cleanly close channel {}", channel);
            self.report_error(&e);
        }
        Ok(())
    }

    /// Force every channel to `Closed`, used in error recovery
    pub fn clear_channel_states(&mut self) {
        self.close_all_channels();
    }

    /// Reset the radio; a deferred open is performed once the reset completes
    pub fn request_reset(&mut self) {
        self.session.reset_sent = true;
        match self.sink.send(Command::ResetSystem) {
            Ok(()) => info!("Requested ANT reset"),
            Err(e) => {
                error!("Could not reset ANT: {}", e);
                self.session.reset_sent = false;
                if self.session.deferred_open {
                    self.session.deferred_open = false;
                    self.set_state(GEO_CHANNEL, ChannelState::Closed);
                }
                self.session.errored = true;
                self.callbacks.on_error();
            }
        }
    }

    /// Ask the radio to power up
    pub fn enable(&mut self) {
        if self.session.disabling {
            debug!("Not enabling ANT while a disable is in progress");
            return;
        }
        self.send(Command::Enable);
    }

    /// Ask the radio to power down
    pub fn disable(&mut self) {
        if self.session.enabling {
            debug!("Not disabling ANT while an enable is in progress");
            return;
        }
        self.send(Command::Disable);
    }

    /// Ask for control of the radio interface
    pub fn try_claim_interface(&mut self) {
        self.send(Command::ClaimInterface);
    }

    /// Load the network key and event buffering settings into the radio
    pub fn apply_device_configuration(&mut self) {
        if !self.session.is_ready() {
            info!("Can't configure the radio right now");
            return;
        }

        if let Some(key) = self.network_key {
            let network = self.network;
            if let Err(e) = self.sink.send(Command::SetNetworkKey { network, key }) {
                error!("Could not set network key: {}", e);
            }
        }

        let threshold = self.settings.buffer_threshold;
        let command = if threshold > 0 {
            Command::ConfigureEventBuffering { threshold }
        } else {
            Command::DisableEventBuffering
        };
        if let Err(e) = self.sink.send(command) {
            error!("Could not configure event buffering: {}", e);
        }
    }

    /// Process one inbound ANT message
    ///
    /// Messages that cannot be decoded, or that name an unregistered channel,
    /// are dropped.
    pub fn handle_message(&mut self, message: &AntMessage) {
        debug!("Rx: [{:02X}]{}", message.id, hex_dump(&message.data));

        let result = if message.is_channel_data() {
            self.handle_channel_data(message)
        } else {
            match message.id {
                MESG_STARTUP_MESG_ID => {
                    self.handle_device_event(DeviceEvent::Reset);
                    Ok(())
                }
                MESG_RESPONSE_EVENT_ID => self.handle_channel_response(&message.data),
                MESG_CHANNEL_ID_ID => self.handle_channel_id(&message.data),
                _ => Ok(()),
            }
        };

        if let Err(e) = result {
            debug!("Dropped message 0x{:02X}: {}", message.id, e);
        }
    }

    fn handle_channel_data(&mut self, message: &AntMessage) -> Result<()> {
        let channel = message
            .channel()
            .ok_or_else(|| AntChirpError::MalformedFrame("Empty data message".to_string()))?;
        let state = self.channel_state(channel)?;
        let page = Page::decode(&message.data)?;

        if state != ChannelState::Closed {
            self.set_state(channel, ChannelState::TrackingData);
        }

        if self.settings.device_number == WILDCARD_DEVICE_NUMBER {
            info!("Requesting device number");
            self.send(Command::RequestMessage {
                channel,
                message_id: MESG_CHANNEL_ID_ID,
            });
        }

        info!("Received geocache page {}", page.number());
        if let Page::Unknown { page } = page {
            debug!("Ignoring unknown geocache page {}", page);
            return Ok(());
        }

        if self.record.apply(&page) {
            self.callbacks.on_channel_data_changed(channel, &self.record);
        }

        for number in follow_up_pages(&page) {
            if let Err(e) = request_page(&mut self.sink, channel, number) {
                self.report_error(&e);
            }
        }

        Ok(())
    }

    fn handle_channel_response(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 3 {
            return Err(AntChirpError::MalformedFrame(format!(
                "Channel response too short: {} bytes",
                data.len()
            )));
        }
        let (channel, message_id, code) = (data[0], data[1], data[2]);
        self.channel(channel)?;

        if message_id == MESG_EVENT_ID && code == EVENT_RX_SEARCH_TIMEOUT {
            info!("Search timeout on channel {}", channel);
            self.channel_mut(channel)?.config.settle();
            self.set_state(channel, ChannelState::Offline);
            self.send(Command::UnassignChannel { channel });
        }

        let (initializing, deinitializing) = {
            let config = &self.channel(channel)?.config;
            (config.initializing, config.deinitializing)
        };
        if initializing {
            self.advance_setup(channel, message_id, code)
        } else if deinitializing {
            self.advance_teardown(channel, message_id, code)
        } else {
            Ok(())
        }
    }

    fn advance_setup(&mut self, channel: u8, message_id: u8, code: u8) -> Result<()> {
        if code != RESPONSE_NO_ERROR {
            let err = AntChirpError::Protocol {
                channel,
                message_id,
                code,
            };
            error!("{}", err);
            return Ok(());
        }

        let network = self.network;
        let slot = self.channel_mut(channel)?;
        let Some(awaiting) = slot.config.awaiting else {
            return Ok(());
        };
        if awaiting.message_id() != message_id {
            debug!(
                "Ignoring confirmation of 0x{:02X} on channel {} while awaiting {:?}",
                message_id, channel, awaiting
            );
            return Ok(());
        }

        match awaiting.next(slot.config.is_wildcard()) {
            Some(next) => {
                slot.config.awaiting = Some(next);
                let command = setup_command(channel, &slot.config, next, network);
                self.send(command);
            }
            None => {
                slot.config.settle();
                info!("Channel {} open, searching", channel);
                self.set_state(channel, ChannelState::Searching);
            }
        }

        Ok(())
    }

    fn advance_teardown(&mut self, channel: u8, message_id: u8, code: u8) -> Result<()> {
        if message_id == MESG_EVENT_ID && code == EVENT_CHANNEL_CLOSED {
            self.send(Command::UnassignChannel { channel });
        } else if message_id == MESG_UNASSIGN_CHANNEL_ID && code == RESPONSE_NO_ERROR {
            debug!("Channel {} unassigned", channel);
            self.channel_mut(channel)?.config.deinitializing = false;
        }
        Ok(())
    }

    fn handle_channel_id(&mut self, data: &[u8]) -> Result<()> {
        let channel = *data
            .first()
            .ok_or_else(|| AntChirpError::MalformedFrame("Empty channel id message".to_string()))?;
        let device_number = read_le16(data, 1)?;

        self.channel_mut(channel)?.config.device_number = device_number;
        if channel == GEO_CHANNEL {
            info!("Received GEO device number ({})", device_number);
            self.settings.device_number = device_number;
        }
        Ok(())
    }

    /// Process a device-wide radio event
    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Enabling => {
                info!("ANT enabling");
                self.session.enabling = true;
                self.session.disabling = false;
            }
            DeviceEvent::Enabled => {
                info!("ANT enabled");
                self.session.enabling = false;
                self.session.disabling = false;
                self.session.enabled = true;
                self.session.errored = false;
            }
            DeviceEvent::Disabling => {
                info!("ANT disabling");
                self.session.enabling = false;
                self.session.disabling = true;
            }
            DeviceEvent::Disabled => {
                info!("ANT disabled");
                self.session.enabling = false;
                self.session.disabling = false;
                self.session.enabled = false;
                self.close_all_channels();
            }
            DeviceEvent::Reset => {
                if self.session.reset_sent {
                    debug!("ANT reset complete");
                    self.session.reset_sent = false;
                    self.session.errored = false;
                    self.apply_device_configuration();
                    if self.session.deferred_open {
                        self.session.deferred_open = false;
                        if let Err(e) = self.open_channel(GEO_CHANNEL, false) {
                            warn!("Deferred open failed: {}", e);
                        }
                    }
                } else {
                    info!("ANT reset by someone else, resetting channel state");
                    self.close_all_channels();
                }
            }
            DeviceEvent::InterfaceClaimed { claimed } => {
                let was_claimed = self.session.claimed_interface;
                self.session.claimed_interface = claimed;
                if claimed {
                    info!("ANT interface claimed");
                } else if was_claimed {
                    info!("ANT interface released to another application");
                }
            }
        }

        self.callbacks.on_device_state_changed(self.session.status());
    }
}

impl<S, C> RadioEventHandler for AntManager<S, C>
where
    S: RadioCommandSink,
    C: ManagerCallbacks,
{
    fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::Message(message) => self.handle_message(&message),
            RadioEvent::Device(event) => self.handle_device_event(event),
        }
    }
}
