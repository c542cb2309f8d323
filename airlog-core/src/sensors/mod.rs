//! Sensor sources and the polling task that drives them
//!
//! A [`SensorSource`] knows how to perform one read of one device through
//! its hardware collaborator and return the raw payload. [`SensorTask`] is
//! the single loop implementation shared by every modality: it polls a
//! source, absorbs transient faults, and pushes samples to its channel.
//!
//! | Source          | Collaborator        | Payload                      |
//! |-----------------|---------------------|------------------------------|
//! | [`Ds18b20Source`] | `OneWireBus`       | `RawPayload::OneWire`        |
//! | [`Sht30Source`]   | `I2cBus`           | `RawPayload::HumidityTemp`   |
//! | [`Ms4525Source`]  | `I2cBus`           | `RawPayload::Pressure`       |
//! | [`Fl808Source`]   | `GpioEdgeWatcher`  | `RawPayload::EdgeCount`      |

pub mod ds18b20;
pub mod fl808;
pub mod ms4525;
pub mod sht30;
pub mod task;

pub use ds18b20::Ds18b20Source;
pub use fl808::Fl808Source;
pub use ms4525::Ms4525Source;
pub use sht30::Sht30Source;
pub use task::{PollOutcome, SensorHandle, SensorTask, SpawnTask, TaskStats, TaskSummary};

use crate::errors::HardwareResult;
use crate::sample::{RawPayload, SensorClass};

/// One readable device
///
/// `read` performs a complete device transaction (command, wait, read-out)
/// before returning, so stopping between calls never leaves the device
/// mid-transfer.
pub trait SensorSource: Send {
    /// Name used in diagnostics, e.g. `sht30@i2c-1:0x44`
    fn name(&self) -> &str;

    /// Sensor class of every payload this source yields
    fn class(&self) -> SensorClass;

    /// Perform one read
    ///
    /// - `Ok(Some(_))`: a fresh sample
    /// - `Ok(None)`: nothing new this time (device absent or data stale)
    /// - `Err(_)`: transient fault; the caller backs off and retries
    fn read(&mut self) -> HardwareResult<Option<RawPayload>>;
}

impl<T: SensorSource + ?Sized> SensorSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn class(&self) -> SensorClass {
        (**self).class()
    }

    fn read(&mut self) -> HardwareResult<Option<RawPayload>> {
        (**self).read()
    }
}
