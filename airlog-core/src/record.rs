//! Log records and the persisted row schema
//!
//! A [`LogRecord`] collects whatever readings arrived during one aggregator
//! tick. Every column is always rendered; a field with no data becomes the
//! placeholder token so columns stay aligned.
//!
//! | Column                   | Source             | Format        |
//! |--------------------------|--------------------|---------------|
//! | `diff_pressure_pa`       | MS4525DO           | 2 decimals    |
//! | `ms4525_temp_c`          | MS4525DO           | 2 decimals    |
//! | `airspeed_mps`           | MS4525DO + density | 2 decimals    |
//! | `sht30_primary_temp_c`   | SHT30 primary      | 2 decimals    |
//! | `sht30_primary_rh_pct`   | SHT30 primary      | 2 decimals    |
//! | `sht30_secondary_temp_c` | SHT30 secondary    | 2 decimals    |
//! | `sht30_secondary_rh_pct` | SHT30 secondary    | 2 decimals    |
//! | `ds18b20_temps_c`        | every DS18B20      | `;`-joined    |
//! | `flow_lpm`               | FL808              | 3 decimals    |
//! | `timestamp`              | aggregator clock   | epoch seconds |

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{LIST_SEPARATOR, NO_DATA_PLACEHOLDER};
use crate::reading::{AirspeedReading, HumidityReading, PhysicalReading, ProbeTemperature};
use crate::sample::SensorClass;
use crate::time::Timestamp;

/// Column names, in row order
pub const COLUMNS: [&str; 10] = [
    "diff_pressure_pa",
    "ms4525_temp_c",
    "airspeed_mps",
    "sht30_primary_temp_c",
    "sht30_primary_rh_pct",
    "sht30_secondary_temp_c",
    "sht30_secondary_rh_pct",
    "ds18b20_temps_c",
    "flow_lpm",
    "timestamp",
];

/// Where a channel's readings land in the record
///
/// Two channels of the same class (the two humidity sensors) are told apart
/// by their slot, not by their sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// MS4525DO pressure, temperature and airspeed
    Pressure,
    /// First SHT30
    HumidityPrimary,
    /// Second SHT30
    HumiditySecondary,
    /// All DS18B20 probes
    OneWire,
    /// FL808 flow rate
    Flow,
}

impl Slot {
    /// Sensor class the slot accepts
    pub fn class(&self) -> SensorClass {
        match self {
            Self::Pressure => SensorClass::Pressure,
            Self::HumidityPrimary | Self::HumiditySecondary => SensorClass::Humidity,
            Self::OneWire => SensorClass::OneWire,
            Self::Flow => SensorClass::Flow,
        }
    }

    /// Short lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pressure => "pressure",
            Self::HumidityPrimary => "humidity_primary",
            Self::HumiditySecondary => "humidity_secondary",
            Self::OneWire => "one_wire",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Pressure sensor output
    pub airspeed: Option<AirspeedReading>,
    /// Primary humidity sensor output
    pub humidity_primary: Option<HumidityReading>,
    /// Secondary humidity sensor output
    pub humidity_secondary: Option<HumidityReading>,
    /// Probe sweep, sorted by device id
    pub probes: Option<Vec<ProbeTemperature>>,
    /// Flow rate (L/min)
    pub flow_lpm: Option<f64>,
    /// Tick time (Unix epoch seconds)
    pub timestamp: Timestamp,
}

impl LogRecord {
    /// Empty record stamped `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Store `reading` in `slot`
    ///
    /// Returns `false` and leaves the record untouched when the reading's
    /// class does not match the slot. A later reading for the same slot
    /// replaces an earlier one.
    pub fn apply(&mut self, slot: Slot, reading: PhysicalReading) -> bool {
        match (slot, reading) {
            (Slot::Pressure, PhysicalReading::Airspeed(airspeed)) => self.airspeed = Some(airspeed),
            (Slot::HumidityPrimary, PhysicalReading::Humidity(humidity)) => {
                self.humidity_primary = Some(humidity)
            }
            (Slot::HumiditySecondary, PhysicalReading::Humidity(humidity)) => {
                self.humidity_secondary = Some(humidity)
            }
            (Slot::OneWire, PhysicalReading::OneWire(probes)) => self.probes = Some(probes),
            (Slot::Flow, PhysicalReading::Flow { flow_lpm }) => self.flow_lpm = Some(flow_lpm),
            _ => return false,
        }
        true
    }

    /// Whether no sensor contributed to this record
    pub fn is_empty(&self) -> bool {
        self.airspeed.is_none()
            && self.humidity_primary.is_none()
            && self.humidity_secondary.is_none()
            && self.probes.is_none()
            && self.flow_lpm.is_none()
    }

    /// Humidity for the air density model: primary, then secondary
    pub fn humidity_pct(&self) -> Option<f64> {
        self.humidity_primary
            .or(self.humidity_secondary)
            .map(|reading| reading.humidity_pct)
    }

    /// Render every column, using `placeholder` for missing fields
    pub fn to_row(&self, placeholder: &str) -> Vec<String> {
        let fixed = |value: Option<f64>, decimals: usize| match value {
            Some(value) => format!("{value:.decimals$}"),
            None => placeholder.to_owned(),
        };

        let probes = match &self.probes {
            Some(probes) if !probes.is_empty() => probes
                .iter()
                .map(|probe| format!("{:.2}", probe.temp_c))
                .collect::<Vec<_>>()
                .join(&LIST_SEPARATOR.to_string()),
            _ => placeholder.to_owned(),
        };

        vec![
            fixed(self.airspeed.map(|a| a.pressure_pa), 2),
            fixed(self.airspeed.map(|a| a.temp_c), 2),
            fixed(self.airspeed.map(|a| a.airspeed_mps), 2),
            fixed(self.humidity_primary.map(|h| h.temp_c), 2),
            fixed(self.humidity_primary.map(|h| h.humidity_pct), 2),
            fixed(self.humidity_secondary.map(|h| h.temp_c), 2),
            fixed(self.humidity_secondary.map(|h| h.humidity_pct), 2),
            probes,
            fixed(self.flow_lpm, 3),
            format!("{:.6}", self.timestamp),
        ]
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}]", self.timestamp)?;
        match &self.airspeed {
            Some(a) => write!(
                f,
                " dp={:.2}Pa t={:.2}C v={:.2}m/s",
                a.pressure_pa, a.temp_c, a.airspeed_mps
            )?,
            None => write!(f, " dp={NO_DATA_PLACEHOLDER}")?,
        }
        for (label, humidity) in [("rh1", &self.humidity_primary), ("rh2", &self.humidity_secondary)] {
            match humidity {
                Some(h) => write!(f, " {label}={:.2}%/{:.2}C", h.humidity_pct, h.temp_c)?,
                None => write!(f, " {label}={NO_DATA_PLACEHOLDER}")?,
            }
        }
        match &self.probes {
            Some(probes) if !probes.is_empty() => {
                f.write_str(" probes=")?;
                for (i, probe) in probes.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{LIST_SEPARATOR}")?;
                    }
                    write!(f, "{}:{:.2}C", probe.device_id, probe.temp_c)?;
                }
            }
            _ => write!(f, " probes={NO_DATA_PLACEHOLDER}")?,
        }
        match self.flow_lpm {
            Some(flow) => write!(f, " flow={flow:.3}L/min"),
            None => write!(f, " flow={NO_DATA_PLACEHOLDER}"),
        }
    }
}
