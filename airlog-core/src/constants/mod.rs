//! Constants for airlog Core
//!
//! Centralised constants used throughout the acquisition pipeline. Every
//! numeric value used by the conversion engine or the sensor drivers is
//! defined here with its unit and source.
//!
//! ## Organization
//!
//! - **Physics**: gas constants, reference pressures, unit factors
//! - **Sensors**: register layouts and transfer functions per device
//! - **Time**: default polling cadences
//! - **Output**: log file schema details
//!
//! Names always carry their unit as a suffix.

/// Physical constants used by the conversion engine.
pub mod physics;

/// Sensor datasheet values: addresses, commands, transfer functions.
pub mod sensors;

/// Default intervals and windows.
pub mod time;

/// Token written in place of any field that has no data this tick.
pub const NO_DATA_PLACEHOLDER: &str = "NA";

/// Separator between entries of the one-wire temperature list cell.
pub const LIST_SEPARATOR: char = ';';

/// Default relative humidity assumed for air density (%RH).
pub const DEFAULT_AIRSPEED_HUMIDITY_PCT: f64 = 50.0;

/// Default per-channel capacity when dropping the oldest sample.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Default output directory for log files.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// `chrono` format of generated log file names.
pub const LOG_FILE_NAME_FORMAT: &str = "airlog_%Y%m%d_%H%M%S.csv";

pub use physics::{PASCALS_PER_PSI, SEA_LEVEL_PRESSURE_PA};
pub use sensors::{FL808_COUNTS_PER_LITRE, MS4525_DEFAULT_ADDRESS, SHT30_DEFAULT_ADDRESS};
pub use time::{DEFAULT_FAULT_BACKOFF_MS, DEFAULT_FLOW_WINDOW_S, DEFAULT_TICK_INTERVAL_MS};
