//! Time Constants
//!
//! Default polling cadences. The logger is a low-frequency (sub-10 Hz)
//! instrument, so all intervals here are in the tens-of-milliseconds range
//! or above.

/// Interval between aggregator ticks (ms).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Pause after a transient hardware fault before the next attempt (ms).
pub const DEFAULT_FAULT_BACKOFF_MS: u64 = 100;

/// Interval between DS18B20 bus sweeps (ms).
///
/// A 12-bit conversion takes 750 ms per device, so sweeping faster only
/// returns cached values.
pub const DEFAULT_DS18B20_POLL_MS: u64 = 1000;

/// Interval between SHT30 single-shot measurements (ms).
pub const DEFAULT_SHT30_POLL_MS: u64 = 500;

/// Interval between MS4525 reads (ms).
pub const DEFAULT_MS4525_POLL_MS: u64 = 100;

/// Edge-counting window of the flow meter (s).
pub const DEFAULT_FLOW_WINDOW_S: f64 = 2.0;

/// Consecutive faults between repeated warnings for one sensor.
pub const FAULT_WARN_EVERY: u64 = 50;
