//! Conversion Engine: raw register values to physical units
//!
//! ## Humidity / temperature (SHT30)
//!
//! ```text
//! T  = -45 + 175 · raw_temp / 65535      [°C]
//! RH = 100 · raw_hum / 65535             [%RH]
//! ```
//!
//! ## Differential pressure and airspeed (MS4525DO, ±1 psi, type A)
//!
//! The 14-bit bridge output spans 10%..90% of full scale for -1..+1 psi:
//!
//! ```text
//! P = (counts - 1638.3) · 2·6894.76 / 13106.4 - 6894.76     [Pa]
//! T = counts · 200 / 2047 - 50                              [°C]
//! ```
//!
//! Airspeed follows Bernoulli, `v = sqrt(2·q / ρ)`, with the density of
//! moist air at sea-level static pressure:
//!
//! ```text
//! Es = 6.1078 · 10^(7.5·T / (T + 237.3)) · 100      [Pa]  (Tetens)
//! Pv = RH/100 · Es
//! Pd = 101325 - Pv
//! ρ  = Pd / (287.05 · Tk) + Pv / (461.495 · Tk)
//! ```
//!
//! A non-positive dynamic pressure gives exactly zero airspeed.
//!
//! ## Flow (FL808)
//!
//! ```text
//! flow = (edges / window_s) / counts_per_litre · 60     [L/min]
//! ```
//!
//! Every function here is total. Out-of-range raw bits still produce the
//! number the formula gives; only a missing input yields `None`. Results are
//! never clamped, since an impossible value is a useful diagnostic.

use crate::constants::physics::{
    CELSIUS_TO_KELVIN, GAS_CONSTANT_DRY_AIR, GAS_CONSTANT_WATER_VAPOUR, PASCALS_PER_HPA,
    PASCALS_PER_PSI, SEA_LEVEL_PRESSURE_PA, SECONDS_PER_MINUTE, TETENS_A, TETENS_B_C,
    TETENS_E0_HPA,
};
use crate::constants::sensors::{
    DS18B20_CELSIUS_PER_LSB, MS4525_COUNT_OFFSET, MS4525_COUNT_SPAN, MS4525_FULL_SCALE_PSI,
    MS4525_PRESSURE_MASK, MS4525_TEMPERATURE_MASK, MS4525_TEMP_COUNTS_FULL_SCALE,
    MS4525_TEMP_OFFSET_C, MS4525_TEMP_SPAN_C, SHT30_HUMIDITY_SPAN_PCT, SHT30_RAW_FULL_SCALE,
    SHT30_TEMP_OFFSET_C, SHT30_TEMP_SPAN_C,
};
use crate::reading::{AirspeedReading, HumidityReading, PhysicalReading, ProbeTemperature};
use crate::sample::{RawPayload, RawSample};

/// Bridge count at which the differential pressure is zero.
pub const MS4525_ZERO_PRESSURE_COUNT: f64 = MS4525_COUNT_OFFSET + MS4525_COUNT_SPAN / 2.0;

/// Convert SHT30 raw words to temperature and relative humidity
///
/// Returns `None` when either word is missing.
pub fn convert_humidity_temp(raw_temp: Option<u16>, raw_hum: Option<u16>) -> Option<HumidityReading> {
    Some(humidity_from_words(raw_temp?, raw_hum?))
}

fn humidity_from_words(raw_temp: u16, raw_hum: u16) -> HumidityReading {
    HumidityReading {
        temp_c: SHT30_TEMP_OFFSET_C + SHT30_TEMP_SPAN_C * f64::from(raw_temp) / SHT30_RAW_FULL_SCALE,
        humidity_pct: SHT30_HUMIDITY_SPAN_PCT * f64::from(raw_hum) / SHT30_RAW_FULL_SCALE,
    }
}

/// Convert MS4525DO raw words to differential pressure, temperature and airspeed
///
/// Status bits are masked off both words. `humidity_pct` feeds the air
/// density model; pass the configured default when no humidity reading is
/// available. Returns `None` when either word is missing.
pub fn convert_pressure_airspeed(
    raw_pressure: Option<u16>,
    raw_temp: Option<u16>,
    humidity_pct: f64,
) -> Option<AirspeedReading> {
    Some(airspeed_from_words(raw_pressure?, raw_temp?, humidity_pct))
}

fn airspeed_from_words(raw_pressure: u16, raw_temp: u16, humidity_pct: f64) -> AirspeedReading {
    let counts = f64::from(raw_pressure & MS4525_PRESSURE_MASK);
    let temp_counts = f64::from(raw_temp & MS4525_TEMPERATURE_MASK);

    let full_scale_pa = MS4525_FULL_SCALE_PSI * PASCALS_PER_PSI;
    let pressure_pa = (counts - MS4525_COUNT_OFFSET) * (2.0 * full_scale_pa) / MS4525_COUNT_SPAN
        - full_scale_pa;
    let temp_c =
        temp_counts * MS4525_TEMP_SPAN_C / MS4525_TEMP_COUNTS_FULL_SCALE + MS4525_TEMP_OFFSET_C;

    AirspeedReading {
        pressure_pa,
        temp_c,
        airspeed_mps: airspeed_from_dynamic_pressure(pressure_pa, air_density(temp_c, humidity_pct)),
    }
}

/// Saturation vapour pressure over water (Pa), Tetens equation
pub fn saturation_vapour_pressure(temp_c: f64) -> f64 {
    TETENS_E0_HPA * 10f64.powf(TETENS_A * temp_c / (temp_c + TETENS_B_C)) * PASCALS_PER_HPA
}

/// Density of moist air at sea-level static pressure (kg/m³)
pub fn air_density(temp_c: f64, humidity_pct: f64) -> f64 {
    let temp_k = temp_c + CELSIUS_TO_KELVIN;
    let vapour_pa = humidity_pct / 100.0 * saturation_vapour_pressure(temp_c);
    let dry_pa = SEA_LEVEL_PRESSURE_PA - vapour_pa;

    dry_pa / (GAS_CONSTANT_DRY_AIR * temp_k) + vapour_pa / (GAS_CONSTANT_WATER_VAPOUR * temp_k)
}

/// Bernoulli airspeed (m/s) from dynamic pressure (Pa) and density (kg/m³)
///
/// Zero for non-positive pressure, and for a density that is not a positive
/// finite number, so the result is never negative or NaN.
pub fn airspeed_from_dynamic_pressure(pressure_pa: f64, density: f64) -> f64 {
    if pressure_pa <= 0.0 || !(density > 0.0) || !density.is_finite() {
        return 0.0;
    }
    (2.0 * pressure_pa / density).sqrt()
}

/// Flow rate (L/min) from rising edges counted over `window_s` seconds
///
/// A non-positive or non-finite window or pulse constant yields 0.0.
pub fn edges_to_flow_rate(edge_count: u32, window_s: f64, counts_per_litre: f64) -> f64 {
    if !(window_s > 0.0) || !(counts_per_litre > 0.0) || !window_s.is_finite() {
        return 0.0;
    }
    let frequency_hz = f64::from(edge_count) / window_s;
    frequency_hz / counts_per_litre * SECONDS_PER_MINUTE
}

/// DS18B20 temperature register to °C
pub fn ds18b20_raw_to_celsius(raw: i16) -> f64 {
    f64::from(raw) * DS18B20_CELSIUS_PER_LSB
}

/// Parameters the conversion of a sample may depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionContext {
    /// Relative humidity used for air density (%RH)
    pub humidity_pct: f64,
    /// Flow meter pulses per litre
    pub counts_per_litre: f64,
}

/// Convert any raw sample to its physical reading
pub fn convert_sample(sample: RawSample, ctx: &ConversionContext) -> PhysicalReading {
    match sample.into_payload() {
        RawPayload::OneWire(probes) => {
            let mut temps: Vec<ProbeTemperature> = probes
                .into_iter()
                .map(|probe| ProbeTemperature {
                    temp_c: ds18b20_raw_to_celsius(probe.raw),
                    device_id: probe.device_id,
                })
                .collect();
            temps.sort_by(|a, b| a.device_id.cmp(&b.device_id));
            PhysicalReading::OneWire(temps)
        }
        RawPayload::HumidityTemp { raw_temp, raw_hum } => {
            PhysicalReading::Humidity(humidity_from_words(raw_temp, raw_hum))
        }
        RawPayload::Pressure { raw_pressure, raw_temp } => {
            PhysicalReading::Airspeed(airspeed_from_words(raw_pressure, raw_temp, ctx.humidity_pct))
        }
        RawPayload::EdgeCount { count, window_s } => PhysicalReading::Flow {
            flow_lpm: edges_to_flow_rate(count, window_s, ctx.counts_per_litre),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::OneWireRaw;
    use proptest::prelude::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn humidity_boundaries() {
        let low = convert_humidity_temp(Some(0), Some(0)).unwrap();
        assert_eq!(low.temp_c, -45.0);
        assert_eq!(low.humidity_pct, 0.0);

        let high = convert_humidity_temp(Some(65535), Some(65535)).unwrap();
        assert_eq!(high.temp_c, 130.0);
        assert_eq!(high.humidity_pct, 100.0);
    }

    #[test]
    fn humidity_missing_input_is_unavailable() {
        assert!(convert_humidity_temp(None, Some(100)).is_none());
        assert!(convert_humidity_temp(Some(100), None).is_none());
        assert!(convert_pressure_airspeed(None, Some(100), 50.0).is_none());
        assert!(convert_pressure_airspeed(Some(8000), None, 50.0).is_none());
    }

    #[test]
    fn pressure_transfer_function_endpoints() {
        let low = convert_pressure_airspeed(Some(1638), Some(1024), 50.0).unwrap();
        assert!(close(low.pressure_pa, -6894.76, 0.5), "got {}", low.pressure_pa);
        assert_eq!(low.airspeed_mps, 0.0);

        let high = convert_pressure_airspeed(Some(14745), Some(1024), 50.0).unwrap();
        assert!(close(high.pressure_pa, 6894.76, 0.5), "got {}", high.pressure_pa);
        assert!(high.airspeed_mps > 100.0);
    }

    #[test]
    fn status_bits_are_masked() {
        let clean = convert_pressure_airspeed(Some(9000), Some(700), 50.0).unwrap();
        let flagged = convert_pressure_airspeed(Some(9000 | 0xC000), Some(700 | 0xF800), 50.0).unwrap();
        assert_eq!(clean, flagged);
    }

    #[test]
    fn temperature_counts() {
        let reading = convert_pressure_airspeed(Some(8192), Some(0), 50.0).unwrap();
        assert_eq!(reading.temp_c, -50.0);
        let reading = convert_pressure_airspeed(Some(8192), Some(2047), 50.0).unwrap();
        assert!(close(reading.temp_c, 150.0, 1e-9));
    }

    #[test]
    fn zero_pressure_count_gives_zero_airspeed() {
        let below = MS4525_ZERO_PRESSURE_COUNT.floor() as u16;
        let reading = convert_pressure_airspeed(Some(below), Some(1024), 50.0).unwrap();
        assert!(reading.pressure_pa <= 0.0);
        assert_eq!(reading.airspeed_mps, 0.0);
    }

    #[test]
    fn dry_air_density_at_fifteen_degrees() {
        // ISA sea level density is 1.225 kg/m³
        assert!(close(air_density(15.0, 0.0), 1.225, 0.001));
        // Moist air is lighter
        assert!(air_density(15.0, 100.0) < air_density(15.0, 0.0));
    }

    #[test]
    fn known_airspeed() {
        // q = 0.5 · 1.225 · 10² = 61.25 Pa
        let v = airspeed_from_dynamic_pressure(61.25, 1.225);
        assert!(close(v, 10.0, 1e-9));
        assert_eq!(airspeed_from_dynamic_pressure(61.25, 0.0), 0.0);
        assert_eq!(airspeed_from_dynamic_pressure(61.25, f64::NAN), 0.0);
    }

    #[test]
    fn flow_rate_examples() {
        assert_eq!(edges_to_flow_rate(0, 2.0, 334.0), 0.0);
        // 334 edges in 2 s is half a litre per second
        assert!(close(edges_to_flow_rate(334, 2.0, 334.0), 30.0, 1e-12));
        assert!(close(edges_to_flow_rate(668, 2.0, 334.0), 60.0, 1e-12));
    }

    #[test]
    fn flow_rate_matches_bench_script_arithmetic() {
        // The bench script divides by the run time before the pulse constant:
        // (count / runtime) / counts_per_litre * 60. Ten litres a minute at
        // 334 pulses per litre over 2 s therefore needs 111.33 edges, not 334.
        let edges = (10.0 / 60.0 * 334.0 * 2.0_f64).round() as u32;
        assert_eq!(edges, 111);
        assert!(close(edges_to_flow_rate(edges, 2.0, 334.0), 111.0 / 2.0 / 334.0 * 60.0, 1e-12));
        assert!(close(edges_to_flow_rate(edges, 2.0, 334.0), 10.0, 0.05));
    }

    #[test]
    fn flow_rate_degenerate_parameters() {
        assert_eq!(edges_to_flow_rate(100, 0.0, 334.0), 0.0);
        assert_eq!(edges_to_flow_rate(100, 2.0, 0.0), 0.0);
        assert_eq!(edges_to_flow_rate(100, f64::NAN, 334.0), 0.0);
    }

    #[test]
    fn ds18b20_register_values() {
        // Datasheet table 1
        assert_eq!(ds18b20_raw_to_celsius(0x07D0), 125.0);
        assert_eq!(ds18b20_raw_to_celsius(0x0191), 25.0625);
        assert_eq!(ds18b20_raw_to_celsius(0), 0.0);
        assert_eq!(ds18b20_raw_to_celsius(0xFF5Eu16 as i16), -10.125);
        assert_eq!(ds18b20_raw_to_celsius(0xFC90u16 as i16), -55.0);
    }

    #[test]
    fn one_wire_sample_sorted_by_id() {
        let sample = RawSample::new(
            RawPayload::OneWire(vec![
                OneWireRaw { device_id: "28-b".into(), raw: 400 },
                OneWireRaw { device_id: "28-a".into(), raw: 320 },
            ]),
            0.0,
        );
        let ctx = ConversionContext { humidity_pct: 50.0, counts_per_litre: 334.0 };
        match convert_sample(sample, &ctx) {
            PhysicalReading::OneWire(temps) => {
                assert_eq!(temps[0].device_id, "28-a");
                assert_eq!(temps[0].temp_c, 20.0);
                assert_eq!(temps[1].temp_c, 25.0);
            }
            other => panic!("unexpected reading {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn humidity_monotonic_in_each_input(t in 0u16..u16::MAX, h in 0u16..u16::MAX, other in any::<u16>()) {
            let a = convert_humidity_temp(Some(t), Some(other)).unwrap();
            let b = convert_humidity_temp(Some(t + 1), Some(other)).unwrap();
            prop_assert!(b.temp_c > a.temp_c);
            prop_assert_eq!(a.humidity_pct, b.humidity_pct);

            let a = convert_humidity_temp(Some(other), Some(h)).unwrap();
            let b = convert_humidity_temp(Some(other), Some(h + 1)).unwrap();
            prop_assert!(b.humidity_pct > a.humidity_pct);
            prop_assert_eq!(a.temp_c, b.temp_c);
        }

        #[test]
        fn airspeed_never_negative(p in any::<u16>(), t in any::<u16>(), rh in 0.0f64..=100.0) {
            let reading = convert_pressure_airspeed(Some(p), Some(t), rh).unwrap();
            prop_assert!(reading.airspeed_mps >= 0.0);
            prop_assert!(reading.airspeed_mps.is_finite());
            if f64::from(p & MS4525_PRESSURE_MASK) <= MS4525_ZERO_PRESSURE_COUNT {
                prop_assert_eq!(reading.airspeed_mps, 0.0);
            }
        }

        #[test]
        fn flow_rate_linear_in_count(count in 0u32..100_000, window in 0.1f64..60.0) {
            let single = edges_to_flow_rate(count, window, 334.0);
            let double = edges_to_flow_rate(count * 2, window, 334.0);
            prop_assert!(single >= 0.0);
            prop_assert!((double - 2.0 * single).abs() <= 1e-9 * double.max(1.0));
        }
    }
}
