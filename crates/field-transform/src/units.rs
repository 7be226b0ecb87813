//! Unit conversion for climate fields.
//!
//! A handful of model conventions are special-cased (fractions, millibars,
//! geopotential meters, unlabeled SST/ICEFRAC). Everything else goes through
//! [`UnitRegistry`], which maps each known unit to a physical dimension and an
//! affine transform to SI. Converting between two units of the same dimension
//! is then a single `value * coefficient + offset`.

use std::collections::HashMap;

use diags_common::{DiagsError, DiagsResult, Field};
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

/// Standard gravity used by the model output for geopotential height.
const GRAVITY: f64 = 9.8;

/// Targets treated as numerically identical to millibars.
const MILLIBAR_EQUIVALENTS: &[&str] = &["mb", "mbar", "millibar", "millibars", "hPa"];

/// Physical dimension of a registered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Temperature,
    Pressure,
    Length,
    Speed,
    MassFlux,
    EnergyFlux,
    MixingRatio,
    Time,
    Dimensionless,
}

/// A registered unit: `si_value = value * scale + offset`.
#[derive(Debug, Clone, Copy)]
pub struct UnitInfo {
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
}

impl UnitInfo {
    const fn new(dimension: Dimension, scale: f64) -> Self {
        Self {
            dimension,
            scale,
            offset: 0.0,
        }
    }

    const fn affine(dimension: Dimension, scale: f64, offset: f64) -> Self {
        Self {
            dimension,
            scale,
            offset,
        }
    }
}

/// Errors from the generic conversion path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("incompatible dimensions ({from:?} vs {to:?})")]
    IncompatibleDimensions { from: Dimension, to: Dimension },
}

const SECONDS_PER_DAY: f64 = 86_400.0;

static REGISTRY: Lazy<HashMap<&'static str, UnitInfo>> = Lazy::new(|| {
    use Dimension::*;

    let mut map = HashMap::new();
    let mut register = |symbols: &[&'static str], info: UnitInfo| {
        for symbol in symbols {
            map.insert(*symbol, info);
        }
    };

    let fahrenheit_scale = 5.0 / 9.0;
    // Temperature
    register(&["K", "kelvin", "degK"], UnitInfo::new(Temperature, 1.0));
    register(
        &["degC", "C", "deg_C", "celsius", "degrees_C"],
        UnitInfo::affine(Temperature, 1.0, 273.15),
    );
    register(
        &["degF", "F", "fahrenheit"],
        UnitInfo::affine(Temperature, fahrenheit_scale, 273.15 - 32.0 * fahrenheit_scale),
    );
    // Pressure and surface stress
    register(&["Pa", "N/m2", "N/m^2", "N m-2"], UnitInfo::new(Pressure, 1.0));
    register(&["hPa", "mb", "mbar", "millibar", "millibars"], UnitInfo::new(Pressure, 100.0));
    register(&["kPa"], UnitInfo::new(Pressure, 1_000.0));
    register(&["atm"], UnitInfo::new(Pressure, 101_325.0));
    // Length
    register(&["m", "meter", "meters"], UnitInfo::new(Length, 1.0));
    register(&["km"], UnitInfo::new(Length, 1_000.0));
    register(&["hm", "hectometer"], UnitInfo::new(Length, 100.0));
    register(&["dam", "decameter"], UnitInfo::new(Length, 10.0));
    register(&["cm"], UnitInfo::new(Length, 0.01));
    register(&["mm"], UnitInfo::new(Length, 0.001));
    // Speed, including precipitation depth rates
    register(&["m/s", "m s-1", "m s^-1"], UnitInfo::new(Speed, 1.0));
    register(&["km/h", "km h-1"], UnitInfo::new(Speed, 1.0 / 3.6));
    register(&["knots", "kt", "kts"], UnitInfo::new(Speed, 1_852.0 / 3_600.0));
    register(&["mm/s", "mm s-1"], UnitInfo::new(Speed, 1e-3));
    register(
        &["mm/day", "mm/d", "mm day-1", "mm d-1"],
        UnitInfo::new(Speed, 1e-3 / SECONDS_PER_DAY),
    );
    // Mass flux
    register(&["kg/m2/s", "kg m-2 s-1", "kg/m^2/s"], UnitInfo::new(MassFlux, 1.0));
    register(&["g/m2/s", "g m-2 s-1"], UnitInfo::new(MassFlux, 1e-3));
    // Energy flux
    register(&["W/m2", "W m-2", "W/m^2"], UnitInfo::new(EnergyFlux, 1.0));
    // Mixing ratio
    register(&["kg/kg", "kg kg-1"], UnitInfo::new(MixingRatio, 1.0));
    register(&["g/kg", "g kg-1"], UnitInfo::new(MixingRatio, 1e-3));
    // Time
    register(&["s", "sec", "seconds"], UnitInfo::new(Time, 1.0));
    register(&["min", "minutes"], UnitInfo::new(Time, 60.0));
    register(&["h", "hr", "hour", "hours"], UnitInfo::new(Time, 3_600.0));
    register(&["day", "days", "d"], UnitInfo::new(Time, SECONDS_PER_DAY));
    // Dimensionless
    register(&["1", "fraction", "unitless"], UnitInfo::new(Dimensionless, 1.0));
    register(&["%", "percent"], UnitInfo::new(Dimensionless, 0.01));

    map
});

/// Lookup table of known units.
pub struct UnitRegistry;

impl UnitRegistry {
    /// Find a unit by symbol (surrounding whitespace ignored).
    pub fn get(symbol: &str) -> Option<UnitInfo> {
        REGISTRY.get(symbol.trim()).copied()
    }

    pub fn is_known(symbol: &str) -> bool {
        Self::get(symbol).is_some()
    }
}

/// An affine map between two units: `to = from * coefficient + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearConversion {
    pub coefficient: f64,
    pub offset: f64,
}

impl LinearConversion {
    pub const IDENTITY: Self = Self {
        coefficient: 1.0,
        offset: 0.0,
    };

    /// Derive the conversion from `from` to `to`.
    pub fn how(from: &str, to: &str) -> Result<Self, ConversionError> {
        if from.trim() == to.trim() {
            return Ok(Self::IDENTITY);
        }

        let src = UnitRegistry::get(from)
            .ok_or_else(|| ConversionError::UnknownUnit(from.to_string()))?;
        let dst =
            UnitRegistry::get(to).ok_or_else(|| ConversionError::UnknownUnit(to.to_string()))?;

        if src.dimension != dst.dimension {
            return Err(ConversionError::IncompatibleDimensions {
                from: src.dimension,
                to: dst.dimension,
            });
        }

        Ok(Self {
            coefficient: src.scale / dst.scale,
            offset: (src.offset - dst.offset) / dst.scale,
        })
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.coefficient + self.offset
    }
}

/// True when relabelling millibars as `target` needs no rescaling.
pub fn is_millibar_equivalent(target: &str) -> bool {
    MILLIBAR_EQUIVALENTS.contains(&target.trim())
}

/// Convert a field to `target_units`, returning a new field.
///
/// Rules are checked in order:
/// 1. unlabeled `SST`: relabel only
/// 2. unlabeled `ICEFRAC`: scale by 100
/// 3. `fraction`: scale by 100
/// 4. `mb` to a millibar-equivalent target: relabel only
/// 5. `gpm`: divide by 9.8 * 100 (geopotential meters to hectometers)
/// 6. anything else: generic registry conversion
pub fn convert_units(field: &Field, target_units: &str) -> DiagsResult<Field> {
    let conversion_error = |from: &str, reason: String| DiagsError::UnitConversion {
        from: from.to_string(),
        to: target_units.to_string(),
        reason,
    };

    let converted = match field.units() {
        None if field.id() == "SST" => field.clone(),
        None if field.id() == "ICEFRAC" => field.map_values(|v| 100.0 * v),
        None => {
            return Err(conversion_error(
                "<none>",
                format!("'{}' has no units attribute", field.id()),
            ))
        }
        Some("fraction") => field.map_values(|v| 100.0 * v),
        Some("mb") if is_millibar_equivalent(target_units) => field.clone(),
        Some("gpm") => field.map_values(|v| v / (GRAVITY * 100.0)),
        Some(units) => {
            let conversion = LinearConversion::how(units, target_units)
                .map_err(|e| conversion_error(units, e.to_string()))?;
            debug!(
                field = field.id(),
                from = units,
                to = target_units,
                coefficient = conversion.coefficient,
                offset = conversion.offset,
                "Converting units"
            );
            field.map_values(|v| conversion.apply(v))
        }
    };

    Ok(converted.with_units(target_units))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_how_celsius_to_kelvin() {
        let c = LinearConversion::how("degC", "K").unwrap();
        assert!(approx(c.apply(0.0), 273.15));
        assert!(approx(c.apply(-273.15), 0.0));
    }

    #[test]
    fn test_how_fahrenheit_to_celsius() {
        let c = LinearConversion::how("degF", "degC").unwrap();
        assert!(approx(c.apply(32.0), 0.0));
        assert!(approx(c.apply(212.0), 100.0));
    }

    #[test]
    fn test_how_precip_rate() {
        let c = LinearConversion::how("m/s", "mm/day").unwrap();
        assert!(approx(c.coefficient, 86_400_000.0));
        assert_eq!(c.offset, 0.0);
    }

    #[test]
    fn test_how_identity_for_unknown_same_unit() {
        assert_eq!(
            LinearConversion::how("furlong", "furlong").unwrap(),
            LinearConversion::IDENTITY
        );
    }

    #[test]
    fn test_how_errors() {
        assert!(matches!(
            LinearConversion::how("furlong", "m"),
            Err(ConversionError::UnknownUnit(_))
        ));
        assert!(matches!(
            LinearConversion::how("K", "Pa"),
            Err(ConversionError::IncompatibleDimensions { .. })
        ));
    }

    #[test]
    fn test_millibar_equivalents() {
        assert!(is_millibar_equivalent("hPa"));
        assert!(is_millibar_equivalent(" mb "));
        assert!(!is_millibar_equivalent("Pa"));
    }
}
