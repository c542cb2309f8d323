//! Linux one-wire bus through the `w1-gpio` / `w1-therm` sysfs interface
//!
//! Each DS18B20 appears as `/sys/bus/w1/devices/28-xxxxxxxxxxxx/w1_slave`.
//! Reading that file triggers a conversion and returns the scratchpad:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first two bytes are the little-endian temperature register. The
//! kernel verifies the CRC and reports `YES`/`NO` on the first line.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::constants::sensors::{DS18B20_FAMILY_PREFIX, W1_SYSFS_DEVICES_DIR};
use crate::errors::{HardwareError, HardwareResult};
use crate::sample::OneWireRaw;

use super::OneWireBus;

/// One-wire bus read through sysfs
#[derive(Debug, Clone)]
pub struct W1SysfsBus {
    devices_dir: PathBuf,
}

impl Default for W1SysfsBus {
    fn default() -> Self {
        Self::new(W1_SYSFS_DEVICES_DIR)
    }
}

impl W1SysfsBus {
    /// Bus rooted at `devices_dir` (normally `/sys/bus/w1/devices`)
    pub fn new(devices_dir: impl Into<PathBuf>) -> Self {
        Self {
            devices_dir: devices_dir.into(),
        }
    }

    /// Directory scanned for probes
    pub fn devices_dir(&self) -> &Path {
        &self.devices_dir
    }

    fn device_ids(&self) -> HardwareResult<Vec<String>> {
        let entries = match fs::read_dir(&self.devices_dir) {
            Ok(entries) => entries,
            // w1 master not loaded: no probes
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(name) = name.to_str() {
                if name.starts_with(DS18B20_FAMILY_PREFIX) {
                    ids.push(name.to_owned());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl OneWireBus for W1SysfsBus {
    fn read_all(&mut self) -> HardwareResult<Vec<OneWireRaw>> {
        let mut probes = Vec::new();

        for device_id in self.device_ids()? {
            let path = self.devices_dir.join(&device_id).join("w1_slave");
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                // Probe unplugged between listing and reading
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let raw = parse_w1_slave(&contents)?;
            probes.push(OneWireRaw { device_id, raw });
        }

        Ok(probes)
    }
}

/// Parse the contents of a `w1_slave` file into the raw temperature word
pub fn parse_w1_slave(contents: &str) -> HardwareResult<i16> {
    let first = contents.lines().next().ok_or(HardwareError::Parse {
        reason: "empty w1_slave",
    })?;

    if !first.trim_end().ends_with("YES") {
        return Err(HardwareError::Checksum { word: 0 });
    }

    let mut bytes = first.split_whitespace().take(2).map(|b| u8::from_str_radix(b, 16));
    match (bytes.next(), bytes.next()) {
        (Some(Ok(lsb)), Some(Ok(msb))) => Ok(i16::from_le_bytes([lsb, msb])),
        _ => Err(HardwareError::Parse {
            reason: "malformed scratchpad bytes",
        }),
    }
}
