//! # ANTChirp Library
//!
//! Pair with an ANT+ geocache beacon and decode its data pages.
//!
//! The [`manager::AntManager`] drives the geocache channel through its
//! response-driven setup and teardown chains and folds decoded pages into a
//! [`geocache::record::DeviceRecord`]. It talks to the radio only through the
//! traits in [`radio`], so the same state machine runs against an ANT USB
//! stick ([`serial`]) or a test double.

pub mod ant;
pub mod channel;
pub mod config;
pub mod error;
pub mod geocache;
pub mod manager;
pub mod radio;
pub mod serial;
pub mod telemetry;
