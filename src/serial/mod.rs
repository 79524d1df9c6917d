//! # Serial Communication Module
//!
//! Handles serial communication with an ANT USB stick.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Writing queued ANT frames in order
//! - Reassembling inbound frames from the byte stream
//! - Dropping corrupt frames without losing sync

pub mod sink;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::ant::codec::hex_dump;
use crate::ant::decoder::extract_frame;
use crate::error::{AntChirpError, Result};
use crate::radio::RadioEvent;

pub use sink::SerialCommandSink;

/// Default baud rate of ANT USB sticks
pub const ANT_BAUD_RATE: u32 = 57_600;

/// Default ANT device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial bridge on ANT USB sticks
    "/dev/ttyACM0",
];

/// Initial capacity of the receive buffer
const READ_BUFFER_SIZE: usize = 256;

/// ANT USB Serial Port Handler
pub struct AntUsbSerial {
    port: SerialStream,
    device_path: String,
}

impl std::fmt::Debug for AntUsbSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntUsbSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl AntUsbSerial {
    /// Open connection to an ANT USB stick
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, ANT_BAUD_RATE)
    }

    /// Open connection to an ANT USB stick with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Returns
    ///
    /// * `Result<AntUsbSerial>` - Connected serial port or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use antchirp::serial::AntUsbSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = AntUsbSerial::open_with_paths(&["/dev/ttyUSB1"], 57600)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened ANT USB stick at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(AntChirpError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| AntChirpError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into halves for the reader and writer tasks
    pub fn into_split(self) -> (ReadHalf<SerialStream>, WriteHalf<SerialStream>) {
        tokio::io::split(self.port)
    }
}

/// Write queued frames until the queue closes
///
/// # Arguments
///
/// * `writer` - Serial port write half
/// * `frames` - Encoded ANT frames, written in queue order
///
/// # Errors
///
/// Returns `Serial` if a write or flush fails; the task stops at the first
/// failure.
pub async fn run_writer<W>(mut writer: W, mut frames: UnboundedReceiver<Vec<u8>>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        writer
            .write_all(&frame)
            .await
            .map_err(|e| AntChirpError::Serial(format!("Failed to write frame: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| AntChirpError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Tx:{}", hex_dump(&frame));
    }

    debug!("Frame queue closed, writer stopping");
    Ok(())
}

/// Read frames from the port and forward them as radio events
///
/// Corrupt frames are logged and skipped. Returns when the port reaches end
/// of stream or nobody is listening for events any more.
///
/// # Errors
///
/// Returns `Serial` if reading from the port fails
pub async fn run_reader<R>(mut reader: R, events: UnboundedSender<RadioEvent>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        let read = reader
            .read_buf(&mut buffer)
            .await
            .map_err(|e| AntChirpError::Serial(format!("Failed to read serial port: {}", e)))?;
        if read == 0 {
            info!("Serial port closed");
            return Ok(());
        }

        while let Some(frame) = extract_frame(&mut buffer) {
            match frame {
                Ok(message) => {
                    if events.send(RadioEvent::Message(message)).is_err() {
                        debug!("Event queue closed, reader stopping");
                        return Ok(());
                    }
                }
                Err(e) => warn!("Dropped corrupt frame: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ant::protocol::{AntMessage, MESG_BROADCAST_DATA_ID, MESG_RESPONSE_EVENT_ID};
    use std::io;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio_test::io::Builder;

    const OPEN_FRAME: [u8; 5] = [0xA4, 0x01, 0x4B, 0x00, 0xEE];
    const RESET_FRAME: [u8; 5] = [0xA4, 0x01, 0x4A, 0x00, 0xEF];
    // Channel 0 confirms assign-channel
    const RESPONSE_FRAME: [u8; 7] = [0xA4, 0x03, 0x40, 0x00, 0x42, 0x00, 0xA5];

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<RadioEvent>) -> Vec<AntMessage> {
        let mut messages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RadioEvent::Message(message) = event {
                messages.push(message);
            }
        }
        messages
    }

    #[test]
    fn test_constants() {
        assert_eq!(ANT_BAUD_RATE, 57_600);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = AntUsbSerial::open_with_paths(invalid_paths, ANT_BAUD_RATE);

        match result {
            Err(AntChirpError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = AntUsbSerial::open_with_paths(empty_paths, ANT_BAUD_RATE);
        assert!(matches!(result, Err(AntChirpError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = AntUsbSerial::open_port("/dev/nonexistent_serial_device_12345", ANT_BAUD_RATE);

        match result {
            Err(AntChirpError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_writer_writes_frames_in_order() {
        let writer = Builder::new().write(&RESET_FRAME).write(&OPEN_FRAME).build();
        let (tx, rx) = unbounded_channel();

        tx.send(RESET_FRAME.to_vec()).unwrap();
        tx.send(OPEN_FRAME.to_vec()).unwrap();
        drop(tx);

        assert!(run_writer(writer, rx).await.is_ok());
    }

    #[tokio::test]
    async fn test_writer_stops_on_write_error() {
        let writer = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let (tx, rx) = unbounded_channel();
        tx.send(OPEN_FRAME.to_vec()).unwrap();

        let result = run_writer(writer, rx).await;
        assert!(matches!(result, Err(AntChirpError::Serial(_))));
    }

    #[tokio::test]
    async fn test_reader_forwards_messages() {
        let reader = Builder::new().read(&RESPONSE_FRAME).build();
        let (tx, mut rx) = unbounded_channel();

        run_reader(reader, tx).await.unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MESG_RESPONSE_EVENT_ID);
        assert_eq!(messages[0].data, vec![0x00, 0x42, 0x00]);
    }

    #[tokio::test]
    async fn test_reader_reassembles_split_frames() {
        let reader = Builder::new()
            .read(&RESPONSE_FRAME[..2])
            .read(&RESPONSE_FRAME[2..5])
            .read(&RESPONSE_FRAME[5..])
            .build();
        let (tx, mut rx) = unbounded_channel();

        run_reader(reader, tx).await.unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_reader_skips_noise_and_corrupt_frames() {
        let mut corrupt = RESPONSE_FRAME;
        corrupt[6] ^= 0xFF;

        let mut broadcast = vec![0xA4, 0x09, MESG_BROADCAST_DATA_ID, 0x00, 0x01];
        broadcast.extend_from_slice(&[0xFF, 0x05, 0x00, 0x00, 0x00, 0x03, 0xFF]);
        let checksum = crate::ant::checksum::xor_checksum(&broadcast);
        broadcast.push(checksum);

        let reader = Builder::new()
            .read(&[0x00, 0x13, 0x37])
            .read(&corrupt)
            .read(&broadcast)
            .build();
        let (tx, mut rx) = unbounded_channel();

        run_reader(reader, tx).await.unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MESG_BROADCAST_DATA_ID);
        assert_eq!(messages[0].data.len(), 9);
    }

    #[tokio::test]
    async fn test_reader_stops_on_read_error() {
        let reader = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::Other, "device lost"))
            .build();
        let (tx, _rx) = unbounded_channel();

        let result = run_reader(reader, tx).await;
        assert!(matches!(result, Err(AntChirpError::Serial(_))));
    }

    #[tokio::test]
    async fn test_reader_stops_when_events_dropped() {
        let reader = Builder::new().read(&RESPONSE_FRAME).build();
        let (tx, rx) = unbounded_channel();
        drop(rx);

        assert!(run_reader(reader, tx).await.is_ok());
    }

    // Integration test - only runs if an ANT USB stick is connected
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        match AntUsbSerial::open() {
            Ok(serial) => println!("Opened ANT USB stick at: {}", serial.device_path()),
            Err(_) => println!("No ANT hardware detected (this is OK for CI/CD)"),
        }
    }
}
