//! Pipeline configuration
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON file only
//! needs the fields it changes:
//!
//! ```json
//! {
//!   "aggregator": { "tick_interval_ms": 500 },
//!   "logger": { "output_dir": "/var/log/airlog", "sync_each_row": true },
//!   "sht30_secondary": { "enabled": true, "i2c_bus": 3 },
//!   "channel": { "policy": { "drop_oldest": 32 } }
//! }
//! ```
//!
//! [`PipelineConfig::validate`] runs after every load; programmatic
//! configs should call it too before starting a pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::CapacityPolicy;
use crate::constants::sensors::{
    FL808_COUNTS_PER_LITRE, MS4525_DEFAULT_ADDRESS,
    SHT30_DEFAULT_ADDRESS, SHT30_MEASUREMENT_WAIT_MS, W1_SYSFS_DEVICES_DIR,
};
use crate::constants::time::{
    DEFAULT_DS18B20_POLL_MS, DEFAULT_FAULT_BACKOFF_MS, DEFAULT_FLOW_WINDOW_S,
    DEFAULT_MS4525_POLL_MS, DEFAULT_SHT30_POLL_MS, DEFAULT_TICK_INTERVAL_MS,
};
use crate::constants::{DEFAULT_AIRSPEED_HUMIDITY_PCT, DEFAULT_OUTPUT_DIR, NO_DATA_PLACEHOLDER};
use crate::errors::{ConfigError, ConfigResult};

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Aggregator cadence and conversion inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Pause between ticks (ms)
    pub tick_interval_ms: u64,
    /// Humidity assumed for air density when no SHT30 reported this tick (%RH)
    pub default_humidity_pct: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            default_humidity_pct: DEFAULT_AIRSPEED_HUMIDITY_PCT,
        }
    }
}

impl AggregatorConfig {
    /// Set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the fallback humidity
    pub fn with_default_humidity(mut self, humidity_pct: f64) -> Self {
        self.default_humidity_pct = humidity_pct;
        self
    }

    /// Tick interval as a `Duration`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("aggregator.tick_interval_ms", "must be positive"));
        }
        if !(0.0..=100.0).contains(&self.default_humidity_pct) {
            return Err(invalid("aggregator.default_humidity_pct", "must be within 0..=100"));
        }
        Ok(())
    }
}

/// Output file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Directory for log files, created if missing
    pub output_dir: PathBuf,
    /// Fixed file name; a timestamped name is generated when unset
    pub file_name: Option<String>,
    /// Append to an existing `file_name` instead of failing
    pub append: bool,
    /// `fsync` after every row, not just flush
    pub sync_each_row: bool,
    /// Token written for missing fields
    pub placeholder: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_name: None,
            append: false,
            sync_each_row: false,
            placeholder: NO_DATA_PLACEHOLDER.to_owned(),
        }
    }
}

impl LoggerConfig {
    /// Log into `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Use a fixed file name
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Append to an existing file
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// `fsync` every row
    pub fn with_sync_each_row(mut self, sync: bool) -> Self {
        self.sync_each_row = sync;
        self
    }

    /// Missing-field token
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.placeholder.is_empty() {
            return Err(invalid("logger.placeholder", "must not be empty"));
        }
        if self.placeholder.contains([',', '"', '\n']) {
            return Err(invalid("logger.placeholder", "must not contain delimiter or quote characters"));
        }
        if let Some(name) = &self.file_name {
            if name.is_empty() || Path::new(name).components().count() != 1 {
                return Err(invalid("logger.file_name", "must be a plain file name"));
            }
        }
        Ok(())
    }
}

/// Channel settings shared by every sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Capacity policy of every channel
    pub policy: CapacityPolicy,
}

impl ChannelConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.policy == CapacityPolicy::DropOldest(0) {
            return Err(invalid("channel.policy", "capacity must be positive"));
        }
        Ok(())
    }
}

/// DS18B20 probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ds18b20Config {
    /// Start a task for the one-wire bus
    pub enabled: bool,
    /// sysfs device directory
    pub devices_dir: PathBuf,
    /// Pause between sweeps (ms)
    pub poll_interval_ms: u64,
}

impl Default for Ds18b20Config {
    fn default() -> Self {
        Self {
            enabled: true,
            devices_dir: PathBuf::from(W1_SYSFS_DEVICES_DIR),
            poll_interval_ms: DEFAULT_DS18B20_POLL_MS,
        }
    }
}

/// One SHT30
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sht30Config {
    /// Start a task for this sensor
    pub enabled: bool,
    /// Number of the I2C bus the handle passed to the builder drives
    ///
    /// Names the task and keeps two sensors off the same bus and address.
    pub i2c_bus: u8,
    /// 7-bit device address
    pub address: u8,
    /// Delay between measurement command and read-out (ms)
    pub measurement_wait_ms: u64,
    /// Reject frames whose CRC does not match
    pub verify_crc: bool,
    /// Pause between reads (ms)
    pub poll_interval_ms: u64,
}

impl Default for Sht30Config {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_bus: 1,
            address: SHT30_DEFAULT_ADDRESS,
            measurement_wait_ms: SHT30_MEASUREMENT_WAIT_MS,
            verify_crc: true,
            poll_interval_ms: DEFAULT_SHT30_POLL_MS,
        }
    }
}

impl Sht30Config {
    /// Defaults for the second sensor, disabled until configured
    pub fn secondary() -> Self {
        Self {
            enabled: false,
            i2c_bus: 3,
            ..Self::default()
        }
    }

    /// Set the bus and address
    pub fn with_device(mut self, i2c_bus: u8, address: u8) -> Self {
        self.i2c_bus = i2c_bus;
        self.address = address;
        self
    }

    /// Enable or disable CRC checking
    pub fn with_crc_check(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    fn validate(&self, field: &'static str) -> ConfigResult<()> {
        if self.address > 0x7F {
            return Err(invalid(field, "address must be a 7-bit I2C address"));
        }
        Ok(())
    }
}

/// MS4525DO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ms4525Config {
    /// Start a task for this sensor
    pub enabled: bool,
    /// Number of the I2C bus the handle passed to the builder drives
    ///
    /// Names the task and keeps two sensors off the same bus and address.
    pub i2c_bus: u8,
    /// 7-bit device address
    pub address: u8,
    /// Pause between reads (ms)
    pub poll_interval_ms: u64,
}

impl Default for Ms4525Config {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_bus: 1,
            address: MS4525_DEFAULT_ADDRESS,
            poll_interval_ms: DEFAULT_MS4525_POLL_MS,
        }
    }
}

impl Ms4525Config {
    fn validate(&self) -> ConfigResult<()> {
        if self.address > 0x7F {
            return Err(invalid("ms4525.address", "address must be a 7-bit I2C address"));
        }
        Ok(())
    }
}

/// FL808 flow meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fl808Config {
    /// Start a task for this sensor
    pub enabled: bool,
    /// Edge counting window (s)
    pub window_s: f64,
    /// Pulses per litre
    pub counts_per_litre: f64,
}

impl Default for Fl808Config {
    fn default() -> Self {
        Self {
            enabled: true,
            window_s: DEFAULT_FLOW_WINDOW_S,
            counts_per_litre: FL808_COUNTS_PER_LITRE,
        }
    }
}

impl Fl808Config {
    /// Set the counting window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_s = window.as_secs_f64();
        self
    }

    /// Counting window as a `Duration`; only meaningful after validation
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.window_s).unwrap_or(Duration::ZERO)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(self.window_s > 0.0) || !self.window_s.is_finite() {
            return Err(invalid("fl808.window_s", "must be a positive number of seconds"));
        }
        if !(self.counts_per_litre > 0.0) || !self.counts_per_litre.is_finite() {
            return Err(invalid("fl808.counts_per_litre", "must be positive"));
        }
        Ok(())
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Aggregator settings
    pub aggregator: AggregatorConfig,
    /// Output file settings
    pub logger: LoggerConfig,
    /// Channel settings
    pub channel: ChannelConfig,
    /// Pause after a failed hardware read (ms), shared by every task
    pub fault_backoff_ms: u64,
    /// One-wire probes
    pub ds18b20: Ds18b20Config,
    /// Primary humidity sensor
    pub sht30_primary: Sht30Config,
    /// Secondary humidity sensor
    pub sht30_secondary: Sht30Config,
    /// Differential pressure sensor
    pub ms4525: Ms4525Config,
    /// Flow meter
    pub fl808: Fl808Config,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            logger: LoggerConfig::default(),
            channel: ChannelConfig::default(),
            fault_backoff_ms: DEFAULT_FAULT_BACKOFF_MS,
            ds18b20: Ds18b20Config::default(),
            sht30_primary: Sht30Config::default(),
            sht30_secondary: Sht30Config::secondary(),
            ms4525: Ms4525Config::default(),
            fl808: Fl808Config::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the aggregator settings
    pub fn with_aggregator(mut self, aggregator: AggregatorConfig) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Replace the logger settings
    pub fn with_logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = logger;
        self
    }

    /// Set the channel policy
    pub fn with_channel_policy(mut self, policy: CapacityPolicy) -> Self {
        self.channel.policy = policy;
        self
    }

    /// Set the fault backoff
    pub fn with_fault_backoff(mut self, backoff: Duration) -> Self {
        self.fault_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Fault backoff as a `Duration`
    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }

    /// Check every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.aggregator.validate()?;
        self.logger.validate()?;
        self.channel.validate()?;
        self.sht30_primary.validate("sht30_primary.address")?;
        self.sht30_secondary.validate("sht30_secondary.address")?;
        self.ms4525.validate()?;
        self.fl808.validate()?;

        let primary = &self.sht30_primary;
        let secondary = &self.sht30_secondary;
        if primary.enabled
            && secondary.enabled
            && primary.i2c_bus == secondary.i2c_bus
            && primary.address == secondary.address
        {
            return Err(invalid("sht30_secondary", "shares bus and address with the primary sensor"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.aggregator.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.channel.policy, CapacityPolicy::DropOldest(16));
        assert_eq!(config.logger.placeholder, "NA");
        assert_eq!(config.sht30_primary.address, 0x44);
        assert!(!config.sht30_secondary.enabled);
        assert_eq!(config.fl808.window(), Duration::from_secs(2));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "aggregator": { "tick_interval_ms": 250 }, "channel": { "policy": "unbounded" } }"#,
        )
        .unwrap();
        assert_eq!(config.aggregator.tick_interval_ms, 250);
        assert_eq!(config.aggregator.default_humidity_pct, 50.0);
        assert_eq!(config.channel.policy, CapacityPolicy::Unbounded);
        assert_eq!(config.ms4525.address, 0x28);
    }

    #[test]
    fn invalid_values_rejected() {
        let cases = [
            r#"{ "aggregator": { "tick_interval_ms": 0 } }"#,
            r#"{ "aggregator": { "default_humidity_pct": 120.0 } }"#,
            r#"{ "fl808": { "window_s": 0.0 } }"#,
            r#"{ "fl808": { "counts_per_litre": 0.0 } }"#,
            r#"{ "channel": { "policy": { "drop_oldest": 0 } } }"#,
            r#"{ "logger": { "placeholder": "" } }"#,
            r#"{ "logger": { "file_name": "../escape.csv" } }"#,
            r#"{ "sht30_secondary": { "enabled": true, "i2c_bus": 1 } }"#,
        ];
        for json in cases {
            assert!(
                matches!(PipelineConfig::from_json_str(json), Err(ConfigError::Invalid { .. })),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(PipelineConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn json_round_trip() {
        let config = PipelineConfig::default()
            .with_channel_policy(CapacityPolicy::DropOldest(4))
            .with_fault_backoff(Duration::from_millis(5));
        let json = config.to_json_string().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }
}
