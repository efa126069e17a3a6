//! Circular cross-section geometry and per-trait cross-section derivation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::records::TraitRecord;
use crate::trait_types::{CROSS_SECTION, DIAMETER};

/// Area of a circle of the given diameter: `π·(d/2)²`.
pub fn diameter_to_area(diameter: f64) -> f64 {
    PI * (diameter / 2.0).powi(2)
}

/// Diameter of the single circle with the given area: `2·√(A/π)`.
pub fn equivalent_diameter(area: f64) -> f64 {
    2.0 * (area / PI).sqrt()
}

/// Total area of a set of `(diameter, count)` pairs.
pub fn total_area(fibres: &[(f64, f64)]) -> f64 {
    fibres.iter().map(|(d, count)| count * diameter_to_area(*d)).sum()
}

/// Fibre count as recorded on a diameter trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FibreCount {
    Single { value: f64 },
    Range { min: f64, avg: f64, max: f64 },
}

/// Parse a free-text fibre count.
///
/// `"bundle"` counts as one, `"a-b"` is a range with its midpoint as
/// average, and anything else must start with an integer.
pub fn parse_fibre_count(nfibres: Option<&str>) -> Result<FibreCount, String> {
    let text = match nfibres.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Err("Missing nfibres value".to_string()),
    };

    if text.eq_ignore_ascii_case("bundle") {
        return Ok(FibreCount::Single { value: 1.0 });
    }

    if let Some((low, high)) = text.split_once('-') {
        return match (leading_integer(low), leading_integer(high)) {
            (Some(min), Some(max)) => {
                let (min, max) = (min as f64, max as f64);
                Ok(FibreCount::Range {
                    min,
                    avg: (min + max) / 2.0,
                    max,
                })
            }
            _ => Err("Invalid range format".to_string()),
        };
    }

    leading_integer(text)
        .map(|value| FibreCount::Single { value: value as f64 })
        .ok_or_else(|| "Invalid number format".to_string())
}

/// Integer prefix of `text` (after trimming), e.g. `"12 fibres"` → 12.
pub(crate) fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '+' || *c == '-'))))
        .map_or(text.len(), |(i, _)| i);
    text[..end].parse().ok()
}

/// Total area of one or more fibres, as single value or bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl AreaValue {
    pub fn single(area: f64) -> Self {
        AreaValue {
            single: Some(area),
            min: None,
            avg: None,
            max: None,
        }
    }

    pub fn range(min: f64, avg: f64, max: f64) -> Self {
        AreaValue {
            single: None,
            min: Some(min),
            avg: Some(avg),
            max: Some(max),
        }
    }
}

/// Cross-section attached to a diameter trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub unit: String,
}

/// Area of `count` fibres of diameter `d`: `π·d²/4 · count`.
fn bundle_area(diameter: f64, count: f64) -> f64 {
    PI * diameter * diameter / 4.0 * count
}

/// Cross-section of a diameter trait, scaled by its fibre count.
///
/// Returns `None` for non-diameter traits or traits without a measurement.
pub fn cross_section_for_diameter_trait(record: &TraitRecord) -> Option<CrossSection> {
    if record.trait_type != DIAMETER {
        return None;
    }
    let diameter = record.measurement.filter(|d| *d != 0.0)?;
    let unit = format!("{}²", record.unit);

    let cross_section = match parse_fibre_count(record.nfibres.as_deref()) {
        Err(error) => CrossSection {
            area: None,
            error: Some(error),
            unit,
        },
        Ok(FibreCount::Single { value }) => CrossSection {
            area: Some(AreaValue::single(bundle_area(diameter, value))),
            error: None,
            unit,
        },
        Ok(FibreCount::Range { min, avg, max }) => CrossSection {
            area: Some(AreaValue::range(
                bundle_area(diameter, min),
                bundle_area(diameter, avg),
                bundle_area(diameter, max),
            )),
            error: None,
            unit,
        },
    };
    Some(cross_section)
}

/// Companion `cross_section` trait for a diameter trait.
///
/// The standard deviation is propagated to first order:
/// `σ_A = |dA/dd|·σ_d = (π·d/2)·σ_d`.
pub fn derive_cross_section_trait(record: &TraitRecord, new_id: impl Into<String>) -> Option<TraitRecord> {
    if record.trait_type != DIAMETER {
        return None;
    }
    let diameter = record.measurement.filter(|d| *d != 0.0)?;

    let mut derived = record.clone();
    derived.id = new_id.into();
    derived.trait_type = CROSS_SECTION.to_string();
    derived.measurement = Some(diameter_to_area(diameter));
    derived.std = record.std.filter(|s| *s != 0.0).map(|s| PI * diameter / 2.0 * s);
    derived.unit = format!("{}²", record.unit);
    derived.diameter_conversion = None;
    derived.logbook = Vec::new();
    Some(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_diameter_identity() {
        for d in [0.5, 5.0, 12.3, 250.0] {
            let round_trip = equivalent_diameter(diameter_to_area(d));
            assert!((round_trip - d).abs() < 1e-9 * d);
        }
    }

    #[test]
    fn test_total_area() {
        let area = total_area(&[(5.0, 100.0)]);
        assert!((area - 1963.495).abs() < 1e-3);
        let mixed = total_area(&[(2.0, 1.0), (4.0, 2.0)]);
        assert!((mixed - 9.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_parse_fibre_count() {
        assert_eq!(parse_fibre_count(Some("bundle")), Ok(FibreCount::Single { value: 1.0 }));
        assert_eq!(parse_fibre_count(Some("Bundle")), Ok(FibreCount::Single { value: 1.0 }));
        assert_eq!(parse_fibre_count(Some("8")), Ok(FibreCount::Single { value: 8.0 }));
        assert_eq!(
            parse_fibre_count(Some("2-5")),
            Ok(FibreCount::Range { min: 2.0, avg: 3.5, max: 5.0 })
        );
        assert_eq!(parse_fibre_count(Some(" 2 - 4 ")), Ok(FibreCount::Range { min: 2.0, avg: 3.0, max: 4.0 }));
    }

    #[test]
    fn test_parse_fibre_count_errors() {
        assert_eq!(parse_fibre_count(None).unwrap_err(), "Missing nfibres value");
        assert_eq!(parse_fibre_count(Some("  ")).unwrap_err(), "Missing nfibres value");
        assert_eq!(parse_fibre_count(Some("a-b")).unwrap_err(), "Invalid range format");
        assert_eq!(parse_fibre_count(Some("many")).unwrap_err(), "Invalid number format");
    }

    #[test]
    fn test_cross_section_for_diameter_trait() {
        let single = TraitRecord::new("d1", DIAMETER, 2.0, "µm").with_nfibres("3");
        let cs = cross_section_for_diameter_trait(&single).unwrap();
        assert_eq!(cs.unit, "µm²");
        assert!((cs.area.unwrap().single.unwrap() - 3.0 * PI).abs() < 1e-12);

        let ranged = TraitRecord::new("d2", DIAMETER, 2.0, "µm").with_nfibres("2-4");
        let area = cross_section_for_diameter_trait(&ranged).unwrap().area.unwrap();
        assert!((area.min.unwrap() - 2.0 * PI).abs() < 1e-12);
        assert!((area.avg.unwrap() - 3.0 * PI).abs() < 1e-12);
        assert!((area.max.unwrap() - 4.0 * PI).abs() < 1e-12);

        let broken = TraitRecord::new("d3", DIAMETER, 2.0, "µm");
        let cs = cross_section_for_diameter_trait(&broken).unwrap();
        assert_eq!(cs.error.as_deref(), Some("Missing nfibres value"));
        assert!(cs.area.is_none());

        let other = TraitRecord::new("s1", "stressAtBreak", 1.0, "GPa");
        assert!(cross_section_for_diameter_trait(&other).is_none());
    }

    #[test]
    fn test_derive_cross_section_trait() {
        let diameter = TraitRecord::new("d1", DIAMETER, 4.0, "µm").with_std(0.5);
        let derived = derive_cross_section_trait(&diameter, "d1-cs").unwrap();
        assert_eq!(derived.id, "d1-cs");
        assert_eq!(derived.trait_type, CROSS_SECTION);
        assert_eq!(derived.unit, "µm²");
        assert!((derived.measurement.unwrap() - 4.0 * PI).abs() < 1e-12);
        assert!((derived.std.unwrap() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("12 fibres"), Some(12));
        assert_eq!(leading_integer("  7"), Some(7));
        assert_eq!(leading_integer("x7"), None);
    }
}
