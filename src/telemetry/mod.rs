//! # Telemetry Module
//!
//! Presents manager notifications to the operator and keeps a record of every
//! decoded geocache in JSONL files with rotation.
//!
//! This module handles:
//! - Logging device and channel state changes through `tracing`
//! - Formatting device records as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::channel::session::DeviceStatus;
use crate::channel::ChannelState;
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::geocache::record::DeviceRecord;
use crate::radio::ManagerCallbacks;

const FILE_PREFIX: &str = "geocache_";
const FILE_EXTENSION: &str = "jsonl";

/// One line of a telemetry file
#[derive(Debug, Serialize)]
struct TelemetryEntry<'a> {
    timestamp: String,
    channel: u8,
    record: &'a DeviceRecord,
}

/// Appends device records to rotating JSONL files
#[derive(Debug)]
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    file: Option<File>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    last_stamp: String,
    stamp_seq: u32,
}

impl TelemetryLogger {
    /// Create a logger writing into `config.log_dir`
    ///
    /// # Errors
    ///
    /// Returns error if the log directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            file: None,
            current_path: None,
            records_in_file: 0,
            last_stamp: String::new(),
            stamp_seq: 0,
        })
    }

    /// File currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns error if serialization, rotation or the write fails
    pub fn log_record(&mut self, channel: u8, record: &DeviceRecord) -> Result<()> {
        let entry = TelemetryEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            channel,
            record,
        };
        let line = serde_json::to_string(&entry)?;

        if self.file.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", line)?;
            file.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        let path = self.next_path();
        debug!("Starting telemetry file {}", path.display());

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.file = Some(file);
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Timestamped file name, suffixed when several files start in one second
    ///
    /// Names never repeat within one logger, so a pruned file is not reused.
    fn next_path(&mut self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        if stamp != self.last_stamp {
            self.last_stamp = stamp;
            self.stamp_seq = 0;
        }

        loop {
            let name = match self.stamp_seq {
                0 => format!("{}{}.{}", FILE_PREFIX, self.last_stamp, FILE_EXTENSION),
                n => format!("{}{}_{:03}.{}", FILE_PREFIX, self.last_stamp, n, FILE_EXTENSION),
            };
            self.stamp_seq += 1;

            let path = self.log_dir.join(name);
            if !path.exists() {
                return path;
            }
        }
    }

    /// Telemetry files in the log directory, oldest first
    fn telemetry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name.starts_with(FILE_PREFIX)
                    && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn prune(&self) -> Result<()> {
        let files = self.telemetry_files()?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for path in files.into_iter().take(excess) {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// [`ManagerCallbacks`] that logs every notification and records decoded data
#[derive(Debug, Default)]
pub struct TelemetryCallbacks {
    logger: Option<TelemetryLogger>,
}

impl TelemetryCallbacks {
    /// # Errors
    ///
    /// Returns error if telemetry is enabled and the log directory cannot be
    /// created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let logger = if config.enabled {
            let logger = TelemetryLogger::new(config)?;
            info!("Writing geocache telemetry to {}", config.log_dir);
            Some(logger)
        } else {
            None
        };
        Ok(Self { logger })
    }
}

impl ManagerCallbacks for TelemetryCallbacks {
    fn on_error(&mut self) {
        warn!("ANT radio command failed");
    }

    fn on_device_state_changed(&mut self, status: DeviceStatus) {
        info!("{}", status);
    }

    fn on_channel_state_changed(&mut self, channel: u8, state: ChannelState) {
        info!("Channel {}: {}", channel, state);
    }

    fn on_channel_data_changed(&mut self, channel: u8, record: &DeviceRecord) {
        if record.is_empty() {
            debug!("Channel {}: record cleared", channel);
        } else {
            info!(
                "Geocache {:?}: pin {}, {} pages, ({:.6}, {:.6}), hint {:?}, {} visits",
                record.id,
                record.pin,
                record.total_pages,
                record.latitude_degrees(),
                record.longitude_degrees(),
                record.hint,
                record.logged_visits
            );
        }

        if let Some(logger) = self.logger.as_mut() {
            if let Err(e) = logger.log_record(channel, record) {
                warn!("Failed to write telemetry: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocache::page::Page;
    use tempfile::TempDir;

    fn config(dir: &TempDir, max_records_per_file: usize, max_files_to_keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().into_owned(),
            max_records_per_file,
            max_files_to_keep,
        }
    }

    fn record() -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.apply(&Page::Id { id: "GC1A2B3C4".to_string() });
        record.apply(&Page::Pin { pin: 4321, total_pages: 4 });
        record
    }

    fn lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_log_record_writes_jsonl() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 100, 10)).unwrap();

        logger.log_record(0, &record()).unwrap();
        logger.log_record(0, &record()).unwrap();

        let path = logger.current_path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("geocache_"));
        assert!(name.ends_with(".jsonl"));

        let entries = lines(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["channel"], 0);
        assert_eq!(entries[0]["record"]["id"], "GC1A2B3C4");
        assert_eq!(entries[0]["record"]["pin"], 4321);
        assert!(entries[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 2, 10)).unwrap();

        for _ in 0..5 {
            logger.log_record(0, &record()).unwrap();
        }

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 3);
        let counts: Vec<usize> = files.iter().map(|path| lines(path).len()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 5);
        assert!(counts.iter().all(|&count| count <= 2));
    }

    #[test]
    fn test_retention_keeps_newest_files() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, 1, 2)).unwrap();

        for _ in 0..5 {
            logger.log_record(0, &record()).unwrap();
        }

        let files = logger.telemetry_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&logger.current_path().unwrap().to_path_buf()));
    }

    #[test]
    fn test_unrelated_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let other = dir.path().join("notes.txt");
        fs::write(&other, "keep me").unwrap();

        let mut logger = TelemetryLogger::new(&config(&dir, 1, 1)).unwrap();
        for _ in 0..3 {
            logger.log_record(0, &record()).unwrap();
        }

        assert!(other.exists());
        assert_eq!(logger.telemetry_files().unwrap().len(), 1);
    }

    #[test]
    fn test_creates_missing_log_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let config = TelemetryConfig {
            log_dir: nested.to_string_lossy().into_owned(),
            ..TelemetryConfig::default()
        };

        assert!(TelemetryLogger::new(&config).is_ok());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_callbacks_write_data_changes() {
        let dir = TempDir::new().unwrap();
        let mut callbacks = TelemetryCallbacks::new(&config(&dir, 100, 10)).unwrap();

        callbacks.on_device_state_changed(DeviceStatus::Ready);
        callbacks.on_channel_state_changed(0, ChannelState::TrackingData);
        callbacks.on_channel_data_changed(0, &record());
        callbacks.on_error();

        let logger = callbacks.logger.as_ref().unwrap();
        let entries = lines(logger.current_path().unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["record"]["total_pages"], 4);
    }

    #[test]
    fn test_disabled_telemetry_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, 100, 10);
        config.enabled = false;

        let mut callbacks = TelemetryCallbacks::new(&config).unwrap();
        callbacks.on_channel_data_changed(0, &record());

        assert!(callbacks.logger.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
