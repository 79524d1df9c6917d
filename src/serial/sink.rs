//! Command sink backed by the serial writer task.
//!
//! Wire commands are encoded and queued for [`run_writer`](super::run_writer).
//! Host-level commands (enable, disable, claim interface) have no wire form on
//! a USB stick; they are answered locally with the device events a managed
//! radio service would have produced, queued behind any pending traffic.

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::ant::encoder::{encode_command, encode_frame};
use crate::error::{AntChirpError, Result};
use crate::radio::{Command, DeviceEvent, RadioCommandSink, RadioEvent};

/// Device events a USB stick reports for a host-level command
fn host_events(command: Command) -> Vec<DeviceEvent> {
    match command {
        Command::Enable => vec![DeviceEvent::Enabling, DeviceEvent::Enabled],
        Command::Disable => vec![DeviceEvent::Disabling, DeviceEvent::Disabled],
        Command::ClaimInterface => vec![DeviceEvent::InterfaceClaimed { claimed: true }],
        _ => Vec::new(),
    }
}

/// [`RadioCommandSink`] that feeds the serial writer task
#[derive(Debug, Clone)]
pub struct SerialCommandSink {
    frames: UnboundedSender<Vec<u8>>,
    events: UnboundedSender<RadioEvent>,
}

impl SerialCommandSink {
    /// # Arguments
    ///
    /// * `frames` - Queue drained by the writer task
    /// * `events` - Queue the manager's event loop reads from
    pub fn new(frames: UnboundedSender<Vec<u8>>, events: UnboundedSender<RadioEvent>) -> Self {
        Self { frames, events }
    }
}

impl RadioCommandSink for SerialCommandSink {
    fn send(&mut self, command: Command) -> Result<()> {
        match encode_command(&command) {
            Some(message) => {
                debug!("Queueing {:?}", command);
                self.frames
                    .send(encode_frame(&message))
                    .map_err(|_| AntChirpError::Transport("Serial writer has stopped".to_string()))
            }
            None => {
                for event in host_events(command) {
                    self.events
                        .send(RadioEvent::Device(event))
                        .map_err(|_| AntChirpError::Transport("Event loop has stopped".to_string()))?;
                }
                Ok(())
            }
        }
    }
}
