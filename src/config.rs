//! # Configuration Module
//!
//! Handles loading, validating and saving configuration from TOML files.
//!
//! Every section and every field has a default, so an empty file is a valid
//! configuration. The `[geocache]` section doubles as the persistent settings
//! store: it is written back on shutdown so a learned device number survives
//! restarts.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AntChirpError, Result};

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub geocache: GeocacheConfig,

    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Geocache channel settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GeocacheConfig {
    /// Device number to pair with (0 = wildcard search)
    #[serde(default = "default_device_number")]
    pub device_number: u16,

    /// Proximity search bin used during wildcard search
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: u8,

    /// Event buffering threshold (0 disables buffering)
    #[serde(default = "default_buffer_threshold")]
    pub buffer_threshold: u16,
}

/// Radio network configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    /// Network key loaded after each reset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_key: Option<Vec<u8>>,

    #[serde(default = "default_network")]
    pub network: u8,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Baud rates supported by ANT USB sticks
pub const SUPPORTED_BAUD_RATES: [u32; 7] = [4800, 9600, 19200, 38400, 50000, 57600, 115200];

/// Largest proximity search bin
pub const MAX_PROXIMITY_THRESHOLD: u8 = 10;

/// Largest event buffer size in bytes
pub const MAX_BUFFER_THRESHOLD: u16 = 996;

/// Length of an ANT network key
pub const NETWORK_KEY_LENGTH: usize = 8;

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 57600 }

fn default_device_number() -> u16 { 0 }
fn default_proximity_threshold() -> u8 { 7 }
fn default_buffer_threshold() -> u16 { 0 }

fn default_network() -> u8 { 1 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 1000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for GeocacheConfig {
    fn default() -> Self {
        Self {
            device_number: default_device_number(),
            proximity_threshold: default_proximity_threshold(),
            buffer_threshold: default_buffer_threshold(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            network_key: None,
            network: default_network(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl RadioConfig {
    /// Network key as a fixed-size array, if one is configured
    ///
    /// Only meaningful after validation, which enforces the key length.
    pub fn key(&self) -> Option<[u8; NETWORK_KEY_LENGTH]> {
        self.network_key
            .as_deref()
            .and_then(|bytes| bytes.try_into().ok())
    }
}

fn invalid(message: impl std::fmt::Display) -> AntChirpError {
    AntChirpError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use antchirp::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a TOML file, replacing its contents
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string(self)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.geocache.proximity_threshold > MAX_PROXIMITY_THRESHOLD {
            return Err(invalid(format!(
                "proximity_threshold must be between 0 and {}",
                MAX_PROXIMITY_THRESHOLD
            )));
        }

        if self.geocache.buffer_threshold > MAX_BUFFER_THRESHOLD {
            return Err(invalid(format!(
                "buffer_threshold must be between 0 and {}",
                MAX_BUFFER_THRESHOLD
            )));
        }

        if let Some(key) = &self.radio.network_key {
            if key.len() != NETWORK_KEY_LENGTH {
                return Err(invalid(format!(
                    "network_key must be exactly {} bytes, got {}",
                    NETWORK_KEY_LENGTH,
                    key.len()
                )));
            }
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.geocache.device_number, 0);
        assert_eq!(config.geocache.proximity_threshold, 7);
        assert_eq!(config.geocache.buffer_threshold, 0);
        assert_eq!(config.radio.network, 1);
        assert!(config.radio.key().is_none());
        assert_eq!(config.telemetry.max_records_per_file, 1000);
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[serial]
port = "/dev/ttyUSB1"
baud_rate = 115200

[geocache]
device_number = 4242

[radio]
network_key = [0xB9, 0xA5, 0x21, 0xFB, 0xBD, 0x72, 0xC3, 0x45]

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.geocache.device_number, 4242);
        assert_eq!(config.geocache.proximity_threshold, 7);
        assert_eq!(
            config.radio.key(),
            Some([0xB9, 0xA5, 0x21, 0xFB, 0xBD, 0x72, 0xC3, 0x45])
        );
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/antchirp.toml");
        assert!(matches!(result, Err(AntChirpError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[geocache\ndevice_number = ").unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(matches!(result, Err(AntChirpError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("antchirp.toml");

        let mut config = Config::default();
        config.geocache.device_number = 12345;
        config.geocache.buffer_threshold = 40;
        config.radio.network_key = Some(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_save_overwrites_previous_settings() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut config = Config::default();
        config.geocache.device_number = 1;
        config.save(temp_file.path()).unwrap();
        config.geocache.device_number = 2;
        config.save(temp_file.path()).unwrap();

        let reloaded = Config::load(temp_file.path()).unwrap();
        assert_eq!(reloaded.geocache.device_number, 2);
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_supported_baud_rates() {
        let mut config = Config::default();
        for baud_rate in SUPPORTED_BAUD_RATES {
            config.serial.baud_rate = baud_rate;
            assert!(config.validate().is_ok(), "baud rate {}", baud_rate);
        }

        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_proximity_threshold_range() {
        let mut config = Config::default();
        config.geocache.proximity_threshold = 10;
        assert!(config.validate().is_ok());
        config.geocache.proximity_threshold = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_threshold_range() {
        let mut config = Config::default();
        config.geocache.buffer_threshold = 996;
        assert!(config.validate().is_ok());
        config.geocache.buffer_threshold = 997;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_key_length() {
        let mut config = Config::default();
        config.radio.network_key = Some(vec![0; 7]);
        assert!(config.validate().is_err());
        assert!(config.radio.key().is_none());

        config.radio.network_key = Some(vec![0; 8]);
        assert!(config.validate().is_ok());
        assert_eq!(config.radio.key(), Some([0; 8]));
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }
}
