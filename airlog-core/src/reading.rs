//! Physical readings derived from raw samples
//!
//! Every field has a name and a unit. A quantity that could not be derived
//! is `None`, which the logger renders as the no-data placeholder.

use serde::{Deserialize, Serialize};

use crate::sample::SensorClass;

/// SHT30 output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumidityReading {
    /// Air temperature (°C)
    pub temp_c: f64,
    /// Relative humidity (%RH)
    pub humidity_pct: f64,
}

/// MS4525DO output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirspeedReading {
    /// Differential pressure (Pa), negative when the ports are reversed
    pub pressure_pa: f64,
    /// Sensor die temperature (°C)
    pub temp_c: f64,
    /// Indicated airspeed (m/s), never negative
    pub airspeed_mps: f64,
}

/// One DS18B20 probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeTemperature {
    /// sysfs device id
    pub device_id: String,
    /// Probe temperature (°C)
    pub temp_c: f64,
}

/// A converted reading, one variant per sensor class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalReading {
    /// Probes found during one sweep, sorted by device id
    OneWire(Vec<ProbeTemperature>),
    /// Humidity sensor output
    Humidity(HumidityReading),
    /// Pressure sensor output
    Airspeed(AirspeedReading),
    /// Volumetric flow (L/min)
    Flow {
        /// Flow rate (L/min)
        flow_lpm: f64,
    },
}

impl PhysicalReading {
    /// Sensor class of the reading
    pub fn class(&self) -> SensorClass {
        match self {
            Self::OneWire(_) => SensorClass::OneWire,
            Self::Humidity(_) => SensorClass::Humidity,
            Self::Airspeed(_) => SensorClass::Pressure,
            Self::Flow { .. } => SensorClass::Flow,
        }
    }
}
