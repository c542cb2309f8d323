//! Scripted hardware for tests and bench demos
//!
//! Each simulated device replays a [`Script`] of responses, then keeps
//! returning an idle response once the script runs out. Devices speak the
//! same wire formats as the real parts (SHT30 frames carry valid CRCs,
//! MS4525 frames carry status bits), so the sensor sources under test run
//! their real decoding paths.
//!
//! ```rust
//! use airlog_core::hardware::{I2cBus, Response, Script, SimulatedSht30};
//!
//! let script = Script::idle(Response::Fault).then(Response::Value((0x6666, 0x8000)));
//! let mut bus = SimulatedSht30::new(0x44, script);
//!
//! bus.write_block(0x44, 0x24, &[0x00]).unwrap();
//! let frame = bus.read_block(0x44, 0x00, 6).unwrap();
//! assert_eq!(&frame[..2], &[0x66, 0x66]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::sensors::{MS4525_FRAME_LEN, SHT30_FRAME_LEN, SHT30_MEASURE_HIGH_REPEATABILITY};
use crate::errors::{HardwareError, HardwareResult};
use crate::sample::OneWireRaw;
use crate::sensors::sht30::sensirion_crc8;

use super::{GpioEdgeWatcher, I2cBus, OneWireBus};

/// One scripted device response
#[derive(Debug, Clone, PartialEq)]
pub enum Response<T> {
    /// Successful read returning `T`
    Value(T),
    /// Transient I/O failure
    Fault,
}

/// Queue of responses with a fallback once exhausted
#[derive(Debug, Clone)]
pub struct Script<T> {
    steps: VecDeque<Response<T>>,
    idle: Response<T>,
}

impl<T: Clone> Script<T> {
    /// Empty script answering `idle` forever
    pub fn idle(idle: Response<T>) -> Self {
        Self {
            steps: VecDeque::new(),
            idle,
        }
    }

    /// Script that always returns `value`
    pub fn constant(value: T) -> Self {
        Self::idle(Response::Value(value))
    }

    /// Append a response
    pub fn then(mut self, step: Response<T>) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Append several successful responses
    pub fn then_values(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.steps.extend(values.into_iter().map(Response::Value));
        self
    }

    /// Responses left before falling back to idle
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    fn next(&mut self) -> Response<T> {
        self.steps.pop_front().unwrap_or_else(|| self.idle.clone())
    }

    fn next_result(&mut self) -> HardwareResult<T> {
        match self.next() {
            Response::Value(value) => Ok(value),
            Response::Fault => Err(injected_fault()),
        }
    }
}

fn injected_fault() -> HardwareError {
    HardwareError::Io(io::Error::new(io::ErrorKind::Other, "injected fault"))
}

fn no_device(address: u8) -> HardwareError {
    HardwareError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no device at 0x{address:02x}"),
    ))
}

/// Shared call counter, readable after the device moved into a task
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU64>);

impl CallCounter {
    /// Calls made so far
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// One-wire bus replaying probe sweeps
#[derive(Debug, Clone)]
pub struct SimulatedOneWire {
    script: Script<Vec<OneWireRaw>>,
    latency: Duration,
    calls: CallCounter,
}

impl SimulatedOneWire {
    /// Bus replaying `script`
    pub fn new(script: Script<Vec<OneWireRaw>>) -> Self {
        Self {
            script,
            latency: Duration::ZERO,
            calls: CallCounter::default(),
        }
    }

    /// Delay every read by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Counter of `read_all` calls
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl OneWireBus for SimulatedOneWire {
    fn read_all(&mut self) -> HardwareResult<Vec<OneWireRaw>> {
        self.calls.bump();
        std::thread::sleep(self.latency);
        self.script.next_result()
    }
}

/// SHT30 on its own I2C bus, replaying `(raw_temp, raw_hum)` words
#[derive(Debug, Clone)]
pub struct SimulatedSht30 {
    address: u8,
    script: Script<(u16, u16)>,
    corrupt_crc: bool,
    measurement_pending: bool,
    calls: CallCounter,
}

impl SimulatedSht30 {
    /// Device at `address` replaying `script`
    pub fn new(address: u8, script: Script<(u16, u16)>) -> Self {
        Self {
            address,
            script,
            corrupt_crc: false,
            measurement_pending: false,
            calls: CallCounter::default(),
        }
    }

    /// Flip the humidity CRC byte of every frame
    pub fn with_corrupt_crc(mut self) -> Self {
        self.corrupt_crc = true;
        self
    }

    /// Counter of measurement read-outs
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl I2cBus for SimulatedSht30 {
    fn write_block(&mut self, address: u8, register: u8, data: &[u8]) -> HardwareResult<()> {
        if address != self.address {
            return Err(no_device(address));
        }
        if register == SHT30_MEASURE_HIGH_REPEATABILITY[0] && data == &SHT30_MEASURE_HIGH_REPEATABILITY[1..] {
            self.measurement_pending = true;
        }
        Ok(())
    }

    fn read_block(&mut self, address: u8, _register: u8, length: usize) -> HardwareResult<Vec<u8>> {
        if address != self.address {
            return Err(no_device(address));
        }
        // The real part NACKs a read-out with no measurement started
        if !std::mem::take(&mut self.measurement_pending) {
            return Err(HardwareError::Busy);
        }
        self.calls.bump();

        let (raw_temp, raw_hum) = self.script.next_result()?;
        let t = raw_temp.to_be_bytes();
        let h = raw_hum.to_be_bytes();
        let mut frame = vec![t[0], t[1], sensirion_crc8(&t), h[0], h[1], sensirion_crc8(&h)];
        if self.corrupt_crc {
            frame[5] ^= 0xFF;
        }
        frame.truncate(length.min(SHT30_FRAME_LEN));
        Ok(frame)
    }

    fn read_raw(&mut self, address: u8, length: usize) -> HardwareResult<Vec<u8>> {
        self.read_block(address, 0x00, length)
    }
}

/// MS4525DO replaying `(status, bridge_counts, temp_counts)`
#[derive(Debug, Clone)]
pub struct SimulatedMs4525 {
    address: u8,
    script: Script<(u8, u16, u16)>,
    calls: CallCounter,
}

impl SimulatedMs4525 {
    /// Device at `address` replaying `script`
    pub fn new(address: u8, script: Script<(u8, u16, u16)>) -> Self {
        Self {
            address,
            script,
            calls: CallCounter::default(),
        }
    }

    /// Counter of raw reads
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Encode a frame as the device sends it
    pub fn encode_frame(status: u8, bridge: u16, temp: u16) -> [u8; MS4525_FRAME_LEN] {
        let pressure_word = (u16::from(status & 0x03) << 14) | (bridge & 0x3FFF);
        let temp_word = (temp & 0x07FF) << 5;
        let p = pressure_word.to_be_bytes();
        let t = temp_word.to_be_bytes();
        [p[0], p[1], t[0], t[1]]
    }
}

impl I2cBus for SimulatedMs4525 {
    fn write_block(&mut self, address: u8, _register: u8, _data: &[u8]) -> HardwareResult<()> {
        if address != self.address {
            return Err(no_device(address));
        }
        Ok(())
    }

    fn read_block(&mut self, address: u8, _register: u8, length: usize) -> HardwareResult<Vec<u8>> {
        self.read_raw(address, length)
    }

    fn read_raw(&mut self, address: u8, length: usize) -> HardwareResult<Vec<u8>> {
        if address != self.address {
            return Err(no_device(address));
        }
        self.calls.bump();

        let (status, bridge, temp) = self.script.next_result()?;
        let mut frame = Self::encode_frame(status, bridge, temp).to_vec();
        frame.truncate(length);
        Ok(frame)
    }
}

/// Flow meter replaying edge counts
///
/// Returns immediately instead of blocking for the window unless
/// [`with_realtime`](Self::with_realtime) is set.
#[derive(Debug, Clone)]
pub struct SimulatedFlowMeter {
    script: Script<u32>,
    realtime: bool,
    calls: CallCounter,
}

impl SimulatedFlowMeter {
    /// Meter replaying `script`
    pub fn new(script: Script<u32>) -> Self {
        Self {
            script,
            realtime: false,
            calls: CallCounter::default(),
        }
    }

    /// Block for the full window like the real line watcher
    pub fn with_realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    /// Counter of windows counted
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl GpioEdgeWatcher for SimulatedFlowMeter {
    fn count_rising_edges(&mut self, window: Duration) -> HardwareResult<u32> {
        self.calls.bump();
        if self.realtime {
            std::thread::sleep(window);
        }
        self.script.next_result()
    }
}

/// Bus whose every call fails, for isolation tests
#[derive(Debug, Clone, Default)]
pub struct FaultyBus {
    calls: CallCounter,
}

impl FaultyBus {
    /// New always-failing bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter of failed calls
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    fn fail<T>(&self) -> HardwareResult<T> {
        self.calls.bump();
        Err(injected_fault())
    }
}

impl OneWireBus for FaultyBus {
    fn read_all(&mut self) -> HardwareResult<Vec<OneWireRaw>> {
        self.fail()
    }
}

impl I2cBus for FaultyBus {
    fn write_block(&mut self, _address: u8, _register: u8, _data: &[u8]) -> HardwareResult<()> {
        self.fail()
    }

    fn read_block(&mut self, _address: u8, _register: u8, _length: usize) -> HardwareResult<Vec<u8>> {
        self.fail()
    }

    fn read_raw(&mut self, _address: u8, _length: usize) -> HardwareResult<Vec<u8>> {
        self.fail()
    }
}

impl GpioEdgeWatcher for FaultyBus {
    fn count_rising_edges(&mut self, _window: Duration) -> HardwareResult<u32> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_replays_then_idles() {
        let mut script = Script::idle(Response::Value(0u32)).then_values([1, 2]).then(Response::Fault);
        assert_eq!(script.remaining(), 3);
        assert_eq!(script.next(), Response::Value(1));
        assert_eq!(script.next(), Response::Value(2));
        assert_eq!(script.next(), Response::Fault);
        assert_eq!(script.next(), Response::Value(0));
        assert_eq!(script.next(), Response::Value(0));
    }

    #[test]
    fn sht30_requires_measurement_command() {
        let mut bus = SimulatedSht30::new(0x44, Script::constant((1, 2)));
        assert!(matches!(bus.read_block(0x44, 0, 6), Err(HardwareError::Busy)));

        bus.write_block(0x44, 0x24, &[0x00]).unwrap();
        let frame = bus.read_block(0x44, 0, 6).unwrap();
        assert_eq!(frame.len(), 6);
        assert_eq!(frame[2], sensirion_crc8(&frame[0..2]));
    }

    #[test]
    fn wrong_address_is_absent_device() {
        let mut bus = SimulatedMs4525::new(0x28, Script::constant((0, 8192, 1024)));
        assert!(bus.read_raw(0x29, 4).is_err());
        assert_eq!(bus.read_raw(0x28, 4).unwrap().len(), 4);
    }

    #[test]
    fn ms4525_frame_layout() {
        let frame = SimulatedMs4525::encode_frame(3, 0x3FFF, 0x07FF);
        assert_eq!(frame, [0xFF, 0xFF, 0xFF, 0xE0]);
    }

    #[test]
    fn faulty_bus_counts_calls() {
        let mut bus = FaultyBus::new();
        let calls = bus.calls();
        assert!(OneWireBus::read_all(&mut bus).is_err());
        assert!(bus.count_rising_edges(Duration::ZERO).is_err());
        assert_eq!(calls.get(), 2);
    }
}
