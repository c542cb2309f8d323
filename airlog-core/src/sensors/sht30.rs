//! SHT30 humidity/temperature sensor (single-shot mode)
//!
//! ## Measurement sequence
//!
//! ```text
//! write  [0x24 0x00]             high repeatability, no clock stretching
//! wait   ~20 ms                  conversion takes up to 15.5 ms
//! read   6 bytes                 T_msb T_lsb T_crc RH_msb RH_lsb RH_crc
//! ```
//!
//! Each data word is protected by a Sensirion CRC-8 (poly 0x31, init 0xFF).

use std::time::Duration;

use crate::constants::sensors::{
    SENSIRION_CRC_INIT, SENSIRION_CRC_POLYNOMIAL, SHT30_FRAME_LEN, SHT30_MEASURE_HIGH_REPEATABILITY,
    SHT30_MEASUREMENT_WAIT_MS,
};
use crate::errors::{HardwareError, HardwareResult};
use crate::hardware::I2cBus;
use crate::sample::{RawPayload, SensorClass};

use super::SensorSource;

/// Sensirion CRC-8 over `data`
pub fn sensirion_crc8(data: &[u8]) -> u8 {
    let mut crc = SENSIRION_CRC_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ SENSIRION_CRC_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Split a measurement frame into raw temperature and humidity words
pub fn decode_frame(frame: &[u8], verify_crc: bool) -> HardwareResult<(u16, u16)> {
    if frame.len() < SHT30_FRAME_LEN {
        return Err(HardwareError::ShortRead {
            expected: SHT30_FRAME_LEN,
            actual: frame.len(),
        });
    }

    if verify_crc {
        for (word, chunk) in frame[..SHT30_FRAME_LEN].chunks(3).enumerate() {
            if sensirion_crc8(&chunk[..2]) != chunk[2] {
                return Err(HardwareError::Checksum { word });
            }
        }
    }

    let raw_temp = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_hum = u16::from_be_bytes([frame[3], frame[4]]);
    Ok((raw_temp, raw_hum))
}

/// One SHT30 on an I2C bus
#[derive(Debug)]
pub struct Sht30Source<B> {
    bus: B,
    address: u8,
    name: String,
    verify_crc: bool,
    measurement_wait: Duration,
}

impl<B: I2cBus> Sht30Source<B> {
    /// Sensor at `address` on `bus`
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            name: format!("sht30@0x{address:02x}"),
            verify_crc: true,
            measurement_wait: Duration::from_millis(SHT30_MEASUREMENT_WAIT_MS),
        }
    }

    /// Override the diagnostic name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable CRC checking of frames
    pub fn with_crc_check(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Delay between measurement command and read-out
    pub fn with_measurement_wait(mut self, wait: Duration) -> Self {
        self.measurement_wait = wait;
        self
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: I2cBus> SensorSource for Sht30Source<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> SensorClass {
        SensorClass::Humidity
    }

    fn read(&mut self) -> HardwareResult<Option<RawPayload>> {
        let [command, argument] = SHT30_MEASURE_HIGH_REPEATABILITY;
        self.bus.write_block(self.address, command, &[argument])?;

        std::thread::sleep(self.measurement_wait);

        let frame = self.bus.read_block(self.address, 0x00, SHT30_FRAME_LEN)?;
        let (raw_temp, raw_hum) = decode_frame(&frame, self.verify_crc)?;
        Ok(Some(RawPayload::HumidityTemp { raw_temp, raw_hum }))
    }
}
