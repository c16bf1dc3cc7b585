//! # Configuration Management Module
//!
//! Centralized, validated settings for a serialdump session.
//!
//! ## Configuration Structure
//!
//! - [`SerialConfig`] - device path, line speed and write pacing
//! - [`DisplayConfig`] - display mode and timestamp style
//! - [`LoggingConfig`] - diagnostic log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serialdump::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("serialdump.toml").await?;
//!     config.validate()?;
//!     println!("Serial Port: {} @ {}", config.serial.device, config.serial.baud_rate);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud_rate = 115200
//! delay_us = 6000
//!
//! [display]
//! mode = "slip-auto"
//! timestamp = "format"
//! time_format = "%H:%M:%S"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section and key is optional. Command line flags take precedence:
//! CLI args > Config file > Defaults

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::display::{is_valid_time_format, DisplayMode, TimestampKind, Timestamper};
use crate::errors::SerialDumpError;
use crate::serial::check_baud_rate;

#[cfg(target_os = "linux")]
pub const DEFAULT_DEVICE: &str = "/dev/ttyS0";
#[cfg(not(target_os = "linux"))]
pub const DEFAULT_DEVICE: &str = "/dev/com1";

pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Default inter-byte write delay in microseconds.
pub const DEFAULT_DELAY_US: i64 = 6000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    /// Minimum gap between two bytes written to the device (microseconds, 0 disables).
    pub delay_us: i64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            delay_us: DEFAULT_DELAY_US,
        }
    }
}

impl SerialConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_micros(self.delay_us.max(0) as u64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    /// Line prefix source used when `mode = "date"`.
    pub timestamp: TimestampKind,
    /// strftime format for `timestamp = "format"`; defaults to `%Y-%m-%d %H:%M:%S`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

impl DisplayConfig {
    pub fn timestamper(&self) -> Timestamper {
        Timestamper::new(self.timestamp, self.time_format.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject settings the device or renderer cannot honour.
    pub fn validate(&self) -> std::result::Result<(), SerialDumpError> {
        check_baud_rate(self.serial.baud_rate)?;
        if self.serial.delay_us < 0 {
            return Err(SerialDumpError::InvalidDelay(self.serial.delay_us));
        }
        if let Some(ref format) = self.display.time_format {
            if !is_valid_time_format(format) {
                return Err(SerialDumpError::InvalidTimeFormat(format.clone()));
            }
        }
        Ok(())
    }
}
