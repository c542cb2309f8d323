//! Physical Constants for airlog
//!
//! Fundamental constants used by the conversion engine. All values are in
//! SI units unless the name says otherwise.

// ===== PRESSURE =====

/// Standard atmospheric pressure at sea level (Pa).
///
/// Static pressure assumed when computing air density for the airspeed
/// calculation. The rig has no absolute barometer, so the ISA value is used.
///
/// Source: International Standard Atmosphere (ISA)
pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Pascals per pound-force per square inch (Pa/psi).
///
/// Source: NIST SP 811, Appendix B.8
pub const PASCALS_PER_PSI: f64 = 6894.76;

// ===== TEMPERATURE =====

/// Offset between Celsius and Kelvin scales (K).
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

// ===== GAS CONSTANTS =====

/// Specific gas constant for dry air (J/(kg·K)).
///
/// Source: ICAO Standard Atmosphere, Doc 7488
pub const GAS_CONSTANT_DRY_AIR: f64 = 287.05;

/// Specific gas constant for water vapour (J/(kg·K)).
///
/// Source: CRC Handbook of Chemistry and Physics
pub const GAS_CONSTANT_WATER_VAPOUR: f64 = 461.495;

// ===== TETENS SATURATION VAPOUR PRESSURE =====

/// Saturation vapour pressure at 0 °C for the Tetens equation (hPa).
///
/// `Es(T) = 6.1078 × 10^(7.5·T / (T + 237.3))`
///
/// Source: Tetens, O. (1930), Murray (1967) coefficients
pub const TETENS_E0_HPA: f64 = 6.1078;

/// Tetens exponent numerator coefficient (dimensionless).
pub const TETENS_A: f64 = 7.5;

/// Tetens exponent denominator coefficient (°C).
pub const TETENS_B_C: f64 = 237.3;

/// Pascals per hectopascal.
pub const PASCALS_PER_HPA: f64 = 100.0;

// ===== VOLUME / TIME =====

/// Seconds per minute, for litres-per-minute flow rates.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vapour_constant_exceeds_dry_air() {
        // Humid air is lighter than dry air at equal pressure
        assert!(GAS_CONSTANT_WATER_VAPOUR > GAS_CONSTANT_DRY_AIR);
    }

    #[test]
    fn tetens_at_zero_is_e0() {
        let es = TETENS_E0_HPA * 10f64.powf(TETENS_A * 0.0 / (0.0 + TETENS_B_C));
        assert!((es - TETENS_E0_HPA).abs() < 1e-12);
    }
}
