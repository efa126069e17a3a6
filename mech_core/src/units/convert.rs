//! Prefix-only unit conversion and default-unit normalization.
//!
//! Conversion never crosses base units: `GPa` → `MPa` is a rescale, `GPa` →
//! `mm` is reported as skipped. The result of normalizing a measurement is a
//! [`ConversionOutcome`], which separates "converted", "nothing to do" and
//! "bad value" instead of folding them into an `Option`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::prefix::{default_table, UnitTable};
use crate::trait_types::{DataType, TraitType};

/// A numeric value with its unit string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

impl Measurement {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Measurement {
            value,
            unit: unit.into(),
        }
    }
}

/// Why a measurement was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SkipReason {
    /// The trait type is unknown or has no default unit
    NoDefaultUnit,
    /// Categorical, boolean, ordinal and multiselect traits carry no unit
    NotQuantitative,
    /// Value is already expressed in the default unit
    AlreadyDefault,
    /// Value is zero or absent
    EmptyMeasurement,
    /// Units differ in more than their prefix
    IncompatibleUnits { from: String, to: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoDefaultUnit => write!(f, "No default unit configured for this trait type"),
            SkipReason::NotQuantitative => write!(f, "Trait type is not quantitative"),
            SkipReason::AlreadyDefault => write!(f, "Already in default unit"),
            SkipReason::EmptyMeasurement => write!(f, "Measurement is zero or missing"),
            SkipReason::IncompatibleUnits { from, to } => {
                write!(f, "Incompatible units: {from} cannot be converted to {to}")
            }
        }
    }
}

/// Result of normalizing one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConversionOutcome {
    Converted { value: f64, unit: String },
    Skipped { reason: SkipReason },
    Invalid { reason: String },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }

    /// The converted measurement, if any.
    pub fn converted(&self) -> Option<Measurement> {
        match self {
            ConversionOutcome::Converted { value, unit } => Some(Measurement::new(*value, unit.clone())),
            _ => None,
        }
    }

    /// Human-readable explanation, as recorded in conversion reports.
    pub fn reason(&self, from_unit: &str) -> String {
        match self {
            ConversionOutcome::Converted { unit, .. } => format!("Converting from {from_unit} to {unit}"),
            ConversionOutcome::Skipped { reason } => reason.to_string(),
            ConversionOutcome::Invalid { reason } => reason.clone(),
        }
    }

    fn skipped(reason: SkipReason) -> Self {
        ConversionOutcome::Skipped { reason }
    }
}

impl UnitTable {
    /// True when both units share a base unit (prefixes may differ).
    pub fn are_compatible(&self, a: &str, b: &str) -> bool {
        self.parse_expr(a).same_base(&self.parse_expr(b))
    }

    /// Rescale `value` from one prefix to another.
    ///
    /// Returns `None` when the units are incompatible.
    pub fn convert(&self, value: f64, from: &str, to: &str) -> Option<f64> {
        let from = self.parse_expr(from);
        let to = self.parse_expr(to);
        if !from.same_base(&to) {
            return None;
        }
        let power = from.scale_power() - to.scale_power();
        Some(value * 10f64.powi(power))
    }

    /// Normalize a measurement to its trait type's default unit.
    pub fn convert_to_default(&self, measurement: &Measurement, trait_type: Option<&TraitType>) -> ConversionOutcome {
        let Some(trait_type) = trait_type else {
            return ConversionOutcome::skipped(SkipReason::NoDefaultUnit);
        };
        if trait_type.data_type != DataType::Quantitative {
            return ConversionOutcome::skipped(SkipReason::NotQuantitative);
        }
        let default_unit = match trait_type.default_unit.as_deref() {
            Some(unit) if !unit.trim().is_empty() => unit,
            _ => return ConversionOutcome::skipped(SkipReason::NoDefaultUnit),
        };
        if measurement.unit == default_unit {
            return ConversionOutcome::skipped(SkipReason::AlreadyDefault);
        }
        if !measurement.value.is_finite() {
            return ConversionOutcome::Invalid {
                reason: format!("Measurement {} is not a finite number", measurement.value),
            };
        }
        if measurement.value == 0.0 {
            return ConversionOutcome::skipped(SkipReason::EmptyMeasurement);
        }

        match self.convert(measurement.value, &measurement.unit, default_unit) {
            Some(value) if value.is_finite() => ConversionOutcome::Converted {
                value,
                unit: default_unit.to_string(),
            },
            Some(value) => ConversionOutcome::Invalid {
                reason: format!("Conversion of {} {} overflowed to {value}", measurement.value, measurement.unit),
            },
            None => ConversionOutcome::skipped(SkipReason::IncompatibleUnits {
                from: measurement.unit.clone(),
                to: default_unit.to_string(),
            }),
        }
    }
}

/// True when both units share a base unit, using the default table.
pub fn are_units_compatible(a: &str, b: &str) -> bool {
    default_table().are_compatible(a, b)
}

/// Rescale a value between prefixed units, using the default table.
pub fn convert_measurement(value: f64, from: &str, to: &str) -> Option<f64> {
    default_table().convert(value, from, to)
}

/// Normalize a measurement to the default unit of `trait_type`.
///
/// ```rust
/// use mech_core::trait_types::TraitType;
/// use mech_core::units::{convert_to_default_unit, ConversionOutcome, Measurement};
///
/// let diameter = TraitType::quantitative("diameter", "µm");
/// let outcome = convert_to_default_unit(&Measurement::new(1.0, "mm"), Some(&diameter));
/// assert_eq!(outcome.converted().map(|m| m.unit), Some("µm".to_string()));
/// ```
pub fn convert_to_default_unit(measurement: &Measurement, trait_type: Option<&TraitType>) -> ConversionOutcome {
    default_table().convert_to_default(measurement, trait_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_prefix_scale_law() {
        let micrometres = TraitType::quantitative("diameter", "µm");
        let outcome = convert_to_default_unit(&Measurement::new(1.0, "mm"), Some(&micrometres));
        let converted = outcome.converted().unwrap();
        assert!(approx(converted.value, 1000.0));
        assert_eq!(converted.unit, "µm");
    }

    #[test]
    fn test_idempotent() {
        let stress = TraitType::quantitative("stressAtBreak", "GPa");
        let first = convert_to_default_unit(&Measurement::new(1250.0, "MPa"), Some(&stress))
            .converted()
            .unwrap();
        assert!(approx(first.value, 1.25));

        let second = convert_to_default_unit(&first, Some(&stress));
        assert_eq!(second, ConversionOutcome::Skipped { reason: SkipReason::AlreadyDefault });
    }

    #[test]
    fn test_incompatible_units_are_skipped() {
        let stress = TraitType::quantitative("stressAtBreak", "GPa");
        let outcome = convert_to_default_unit(&Measurement::new(3.0, "mm"), Some(&stress));
        assert_eq!(
            outcome,
            ConversionOutcome::Skipped {
                reason: SkipReason::IncompatibleUnits {
                    from: "mm".to_string(),
                    to: "GPa".to_string()
                }
            }
        );
        assert_eq!(outcome.reason("mm"), "Incompatible units: mm cannot be converted to GPa");
    }

    #[test]
    fn test_zero_and_missing_default() {
        let length = TraitType::quantitative("length", "mm");
        let zero = convert_to_default_unit(&Measurement::new(0.0, "cm"), Some(&length));
        assert_eq!(zero, ConversionOutcome::Skipped { reason: SkipReason::EmptyMeasurement });

        let unknown = convert_to_default_unit(&Measurement::new(2.0, "cm"), None);
        assert_eq!(unknown, ConversionOutcome::Skipped { reason: SkipReason::NoDefaultUnit });
    }

    #[test]
    fn test_negative_values_keep_sign() {
        let length = TraitType::quantitative("length", "mm");
        let converted = convert_to_default_unit(&Measurement::new(-2.5, "cm"), Some(&length))
            .converted()
            .unwrap();
        assert!(approx(converted.value, -25.0));
    }

    #[test]
    fn test_non_finite_is_invalid() {
        let length = TraitType::quantitative("length", "mm");
        let outcome = convert_to_default_unit(&Measurement::new(f64::NAN, "cm"), Some(&length));
        assert!(matches!(outcome, ConversionOutcome::Invalid { .. }));
    }

    #[test]
    fn test_area_and_quotient_conversion() {
        assert!(approx(convert_measurement(1.0, "mm²", "µm²").unwrap(), 1e6));
        assert!(approx(convert_measurement(2.0, "g/cm³", "kg/m³").unwrap(), 2000.0));
        assert!(approx(convert_measurement(5.0, "ng/µl", "µg/ml").unwrap(), 5.0));
        assert!(convert_measurement(1.0, "mm²", "mm").is_none());
    }

    #[test]
    fn test_compatibility() {
        assert!(are_units_compatible("GPa", "kPa"));
        assert!(are_units_compatible("μm", "mm"));
        assert!(!are_units_compatible("GPa", "mm"));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ConversionOutcome::Converted { value: 1000.0, unit: "µm".to_string() };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"converted\""));
    }
}
