//! Raw samples as produced by sensor tasks
//!
//! A [`RawSample`] carries the unconverted register values of one read, tagged
//! with its sensor class and capture time. Samples are created only by the
//! task that owns the hardware and are consumed exactly once by the
//! aggregator, so they are moved, never cloned, through the pipeline.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Sensor modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorClass {
    /// DS18B20 probes on the one-wire bus
    OneWire,
    /// SHT30 humidity/temperature sensor on I2C
    Humidity,
    /// MS4525DO differential pressure sensor on I2C
    Pressure,
    /// FL808 edge-counting flow meter on GPIO
    Flow,
}

impl SensorClass {
    /// Short lowercase name, used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWire => "one-wire",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DS18B20 scratchpad temperature word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneWireRaw {
    /// sysfs device id, e.g. `28-0316a2791aff`
    pub device_id: String,
    /// Two's-complement temperature register, 1/16 °C per LSB
    pub raw: i16,
}

/// Unconverted payload of a read, one variant per sensor class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawPayload {
    /// Every probe found on the bus during one sweep (may be empty)
    OneWire(Vec<OneWireRaw>),

    /// SHT30 raw words
    HumidityTemp {
        /// 16-bit temperature word
        raw_temp: u16,
        /// 16-bit humidity word
        raw_hum: u16,
    },

    /// MS4525DO raw words, status bits still attached
    Pressure {
        /// Status (bits 15..14) and 14-bit bridge data
        raw_pressure: u16,
        /// 11-bit temperature data
        raw_temp: u16,
    },

    /// Rising edges counted over a window
    EdgeCount {
        /// Number of rising edges
        count: u32,
        /// Window length in seconds
        window_s: f64,
    },
}

impl RawPayload {
    /// Sensor class this payload belongs to
    pub fn class(&self) -> SensorClass {
        match self {
            Self::OneWire(_) => SensorClass::OneWire,
            Self::HumidityTemp { .. } => SensorClass::Humidity,
            Self::Pressure { .. } => SensorClass::Pressure,
            Self::EdgeCount { .. } => SensorClass::Flow,
        }
    }
}

/// A timestamped raw read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    payload: RawPayload,
    captured_at: Timestamp,
}

impl RawSample {
    /// Wrap a payload with its capture time
    pub fn new(payload: RawPayload, captured_at: Timestamp) -> Self {
        Self { payload, captured_at }
    }

    /// Sensor class tag, derived from the payload so the two cannot disagree
    pub fn class(&self) -> SensorClass {
        self.payload.class()
    }

    /// Raw payload
    pub fn payload(&self) -> &RawPayload {
        &self.payload
    }

    /// Capture time (Unix epoch seconds)
    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    /// Consume the sample, yielding its payload
    pub fn into_payload(self) -> RawPayload {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_follows_payload() {
        let sample = RawSample::new(RawPayload::HumidityTemp { raw_temp: 1, raw_hum: 2 }, 10.0);
        assert_eq!(sample.class(), SensorClass::Humidity);
        assert_eq!(sample.captured_at(), 10.0);

        let sample = RawSample::new(RawPayload::EdgeCount { count: 5, window_s: 2.0 }, 0.0);
        assert_eq!(sample.class(), SensorClass::Flow);
        assert_eq!(sample.class().to_string(), "flow");
    }
}
