//! DS18B20 one-wire temperature probes

use crate::errors::HardwareResult;
use crate::hardware::OneWireBus;
use crate::sample::{RawPayload, SensorClass};

use super::SensorSource;

/// Every DS18B20 on one one-wire bus
///
/// A sweep with no probes attached still yields a sample with an empty list,
/// which ends up as the no-data marker in the log row.
#[derive(Debug)]
pub struct Ds18b20Source<B> {
    bus: B,
    name: String,
}

impl<B: OneWireBus> Ds18b20Source<B> {
    /// Source reading through `bus`
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            name: "ds18b20@w1".to_owned(),
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

impl<B: OneWireBus> SensorSource for Ds18b20Source<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> SensorClass {
        SensorClass::OneWire
    }

    fn read(&mut self) -> HardwareResult<Option<RawPayload>> {
        let probes = self.bus.read_all()?;
        Ok(Some(RawPayload::OneWire(probes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{Response, Script, SimulatedOneWire};
    use crate::sample::OneWireRaw;

    #[test]
    fn empty_bus_is_an_empty_sample() {
        let mut source = Ds18b20Source::new(SimulatedOneWire::new(Script::constant(Vec::new())));
        assert_eq!(source.read().unwrap(), Some(RawPayload::OneWire(Vec::new())));
    }

    #[test]
    fn probes_pass_through() {
        let probe = OneWireRaw { device_id: "28-01".into(), raw: 400 };
        let bus = SimulatedOneWire::new(Script::idle(Response::Fault).then_values([vec![probe.clone()]]));
        let mut source = Ds18b20Source::new(bus);

        assert_eq!(source.read().unwrap(), Some(RawPayload::OneWire(vec![probe])));
        assert!(source.read().is_err());
    }
}
