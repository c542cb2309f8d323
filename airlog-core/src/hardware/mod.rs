//! Hardware collaborator abstractions
//!
//! Sensor tasks talk to hardware only through these traits. Each handle is
//! owned by exactly one task: the traits take `&mut self`, are `Send` but not
//! required to be `Sync`, and nothing in the crate stores a bus in shared
//! state. Two tasks cannot reach the same bus handle without the compiler
//! noticing.
//!
//! Implementations are expected to bound the duration of every call (bus
//! timeouts live here, not in the pipeline).
//!
//! - [`w1_sysfs`] - Linux kernel one-wire bus via sysfs
//! - [`simulated`] - scripted devices for tests and bench demos

pub mod simulated;
pub mod w1_sysfs;

use std::time::Duration;

use crate::errors::HardwareResult;
use crate::sample::OneWireRaw;

pub use simulated::{
    CallCounter, FaultyBus, Response, Script, SimulatedFlowMeter, SimulatedMs4525, SimulatedOneWire,
    SimulatedSht30,
};
pub use w1_sysfs::W1SysfsBus;

/// One-wire bus master
pub trait OneWireBus: Send {
    /// Read every temperature probe currently on the bus
    ///
    /// An empty vector means no probe is attached; that is not an error.
    fn read_all(&mut self) -> HardwareResult<Vec<OneWireRaw>>;
}

/// I2C bus adapter (SMBus-style transactions)
pub trait I2cBus: Send {
    /// Write `data` to `register` of the device at `address`
    fn write_block(&mut self, address: u8, register: u8, data: &[u8]) -> HardwareResult<()>;

    /// Read `length` bytes starting at `register`
    fn read_block(&mut self, address: u8, register: u8, length: usize) -> HardwareResult<Vec<u8>>;

    /// Plain read of `length` bytes, for devices without register addressing
    fn read_raw(&mut self, address: u8, length: usize) -> HardwareResult<Vec<u8>>;
}

/// GPIO line configured for rising-edge detection
pub trait GpioEdgeWatcher: Send {
    /// Count rising edges over `window`, blocking for its duration
    fn count_rising_edges(&mut self, window: Duration) -> HardwareResult<u32>;
}

impl<T: OneWireBus + ?Sized> OneWireBus for Box<T> {
    fn read_all(&mut self) -> HardwareResult<Vec<OneWireRaw>> {
        (**self).read_all()
    }
}

impl<T: I2cBus + ?Sized> I2cBus for Box<T> {
    fn write_block(&mut self, address: u8, register: u8, data: &[u8]) -> HardwareResult<()> {
        (**self).write_block(address, register, data)
    }

    fn read_block(&mut self, address: u8, register: u8, length: usize) -> HardwareResult<Vec<u8>> {
        (**self).read_block(address, register, length)
    }

    fn read_raw(&mut self, address: u8, length: usize) -> HardwareResult<Vec<u8>> {
        (**self).read_raw(address, length)
    }
}

impl<T: GpioEdgeWatcher + ?Sized> GpioEdgeWatcher for Box<T> {
    fn count_rising_edges(&mut self, window: Duration) -> HardwareResult<u32> {
        (**self).count_rising_edges(window)
    }
}
