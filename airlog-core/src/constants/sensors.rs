//! Sensor Specifications
//!
//! Register layouts, transfer functions and bus parameters for the sensors
//! fitted to the rig, taken from the manufacturers' datasheets.

// ===== SHT30 (I2C humidity / temperature) =====

/// Default I2C address of the SHT30 (ADDR pin low).
///
/// Source: Sensirion SHT3x-DIS datasheet, Table 8
pub const SHT30_DEFAULT_ADDRESS: u8 = 0x44;

/// Single-shot measurement command, high repeatability, clock stretching
/// disabled. Sent as register byte `0x24` followed by data byte `0x00`.
///
/// Source: Sensirion SHT3x-DIS datasheet, Table 9
pub const SHT30_MEASURE_HIGH_REPEATABILITY: [u8; 2] = [0x24, 0x00];

/// Time to wait between the measurement command and the read-out (ms).
///
/// High repeatability measurement takes up to 15.5 ms.
pub const SHT30_MEASUREMENT_WAIT_MS: u64 = 20;

/// Measurement frame length: temp MSB, temp LSB, CRC, hum MSB, hum LSB, CRC.
pub const SHT30_FRAME_LEN: usize = 6;

/// CRC-8 polynomial used by Sensirion sensors (x^8 + x^5 + x^4 + 1).
pub const SENSIRION_CRC_POLYNOMIAL: u8 = 0x31;

/// CRC-8 initial value used by Sensirion sensors.
pub const SENSIRION_CRC_INIT: u8 = 0xFF;

/// Full scale of the SHT30 16-bit raw words.
pub const SHT30_RAW_FULL_SCALE: f64 = 65535.0;

/// SHT30 temperature offset (°C): `T = -45 + 175 · raw / 65535`.
pub const SHT30_TEMP_OFFSET_C: f64 = -45.0;

/// SHT30 temperature span (°C).
pub const SHT30_TEMP_SPAN_C: f64 = 175.0;

/// SHT30 humidity span (%RH): `RH = 100 · raw / 65535`.
pub const SHT30_HUMIDITY_SPAN_PCT: f64 = 100.0;

// ===== MS4525DO (I2C differential pressure) =====

/// Default I2C address of the MS4525DO (interface type I).
///
/// Source: TE Connectivity MS4525DO datasheet, ordering code
pub const MS4525_DEFAULT_ADDRESS: u8 = 0x28;

/// Raw read length: status+bridge MSB, bridge LSB, temp MSB, temp LSB.
pub const MS4525_FRAME_LEN: usize = 4;

/// Mask for the 14-bit bridge (pressure) data.
pub const MS4525_PRESSURE_MASK: u16 = 0x3FFF;

/// Mask for the 11-bit temperature data.
pub const MS4525_TEMPERATURE_MASK: u16 = 0x07FF;

/// Status code: data is fresh.
pub const MS4525_STATUS_NORMAL: u8 = 0;

/// Status code: data already fetched since the last measurement cycle.
pub const MS4525_STATUS_STALE: u8 = 2;

/// Status code: device fault.
pub const MS4525_STATUS_FAULT: u8 = 3;

/// Count at the 10% point of the transfer function (output type A).
///
/// Source: MS4525DO datasheet, 10%..90% of 2^14 counts
pub const MS4525_COUNT_OFFSET: f64 = 1638.3;

/// Count span between the 10% and 90% points of the transfer function.
pub const MS4525_COUNT_SPAN: f64 = 13106.4;

/// Full-scale pressure of the fitted ±1 psi part (psi).
pub const MS4525_FULL_SCALE_PSI: f64 = 1.0;

/// Temperature counts full scale: `T = counts · 200 / 2047 - 50`.
pub const MS4525_TEMP_COUNTS_FULL_SCALE: f64 = 2047.0;

/// MS4525 temperature span (°C).
pub const MS4525_TEMP_SPAN_C: f64 = 200.0;

/// MS4525 temperature offset (°C).
pub const MS4525_TEMP_OFFSET_C: f64 = -50.0;

// ===== DS18B20 (one-wire temperature) =====

/// One-wire family code prefix of DS18B20 devices in sysfs.
pub const DS18B20_FAMILY_PREFIX: &str = "28-";

/// DS18B20 resolution at 12 bits (°C per LSB).
pub const DS18B20_CELSIUS_PER_LSB: f64 = 0.0625;

/// Default sysfs directory of the Linux w1 bus master.
pub const W1_SYSFS_DEVICES_DIR: &str = "/sys/bus/w1/devices";

// ===== FL808 (hall-effect flow meter) =====

/// Pulses emitted per litre by the FL808 flow meter.
pub const FL808_COUNTS_PER_LITRE: f64 = 334.0;
