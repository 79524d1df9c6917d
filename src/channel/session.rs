//! Device-wide radio session flags.
//!
//! A [`RadioSession`] is created together with the channel manager and
//! dropped with it. It tracks what the radio as a whole is doing, independent
//! of any one channel.

use std::fmt;

/// Radio availability as presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Enabling,
    Disabling,
    Disabled,
    /// Another application holds the radio interface
    InUse,
    /// A radio command failed since the last reset
    Error,
    Ready,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeviceStatus::Enabling => "ANT enabling",
            DeviceStatus::Disabling => "ANT disabling",
            DeviceStatus::Disabled => "ANT disabled",
            DeviceStatus::InUse => "ANT in use by another application",
            DeviceStatus::Error => "ANT error",
            DeviceStatus::Ready => "ANT ready",
        };
        f.write_str(text)
    }
}

/// Device-wide flags owned by the channel manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioSession {
    /// Waiting for the radio to report enabled
    pub enabling: bool,
    /// Waiting for the radio to report disabled
    pub disabling: bool,
    /// Radio reported enabled
    pub enabled: bool,
    /// The next reset event was triggered by us
    pub reset_sent: bool,
    /// Opening the geocache channel waits for the next reset
    pub deferred_open: bool,
    /// We hold the radio interface
    pub claimed_interface: bool,
    /// A radio command failed since the radio was last reset or enabled
    pub errored: bool,
}

impl RadioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether device configuration can be applied right now
    pub fn is_ready(&self) -> bool {
        self.enabled && self.claimed_interface
    }

    /// Current status, in priority order
    pub fn status(&self) -> DeviceStatus {
        if self.enabling {
            DeviceStatus::Enabling
        } else if self.disabling {
            DeviceStatus::Disabling
        } else if !self.enabled {
            DeviceStatus::Disabled
        } else if !self.claimed_interface {
            DeviceStatus::InUse
        } else if self.errored {
            DeviceStatus::Error
        } else {
            DeviceStatus::Ready
        }
    }
}
