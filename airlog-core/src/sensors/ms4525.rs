//! MS4525DO differential pressure sensor
//!
//! The part measures continuously; a read-out is a plain 4-byte read:
//!
//! ```text
//! byte 0   S1 S0 P13..P8      status + bridge high bits
//! byte 1   P7..P0
//! byte 2   T10..T3
//! byte 3   T2..T0 x x x x x   low 5 bits unused
//! ```
//!
//! Status `0` is a fresh value, `2` means the value was already read, and
//! `3` flags a diagnostic fault.

use crate::constants::sensors::{MS4525_FRAME_LEN, MS4525_STATUS_FAULT, MS4525_STATUS_STALE};
use crate::errors::{HardwareError, HardwareResult};
use crate::hardware::I2cBus;
use crate::sample::{RawPayload, SensorClass};

use super::SensorSource;

/// Decoded read-out of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ms4525Frame {
    /// Two status bits
    pub status: u8,
    /// Pressure word as received, status bits included
    pub raw_pressure: u16,
    /// 11-bit temperature counts
    pub raw_temp: u16,
}

/// Split a 4-byte read-out into its fields
pub fn decode_frame(frame: &[u8]) -> HardwareResult<Ms4525Frame> {
    if frame.len() < MS4525_FRAME_LEN {
        return Err(HardwareError::ShortRead {
            expected: MS4525_FRAME_LEN,
            actual: frame.len(),
        });
    }

    let raw_pressure = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_temp = u16::from_be_bytes([frame[2], frame[3]]) >> 5;
    Ok(Ms4525Frame {
        status: frame[0] >> 6,
        raw_pressure,
        raw_temp,
    })
}

/// One MS4525DO on an I2C bus
#[derive(Debug)]
pub struct Ms4525Source<B> {
    bus: B,
    address: u8,
    name: String,
}

impl<B: I2cBus> Ms4525Source<B> {
    /// Sensor at `address` on `bus`
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            name: format!("ms4525@0x{address:02x}"),
        }
    }

    /// Override the diagnostic name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: I2cBus> SensorSource for Ms4525Source<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> SensorClass {
        SensorClass::Pressure
    }

    fn read(&mut self) -> HardwareResult<Option<RawPayload>> {
        let bytes = self.bus.read_raw(self.address, MS4525_FRAME_LEN)?;
        let frame = decode_frame(&bytes)?;

        match frame.status {
            MS4525_STATUS_FAULT => Err(HardwareError::DeviceFault { status: frame.status }),
            MS4525_STATUS_STALE => Ok(None),
            _ => Ok(Some(RawPayload::Pressure {
                raw_pressure: frame.raw_pressure,
                raw_temp: frame.raw_temp,
            })),
        }
    }
}
