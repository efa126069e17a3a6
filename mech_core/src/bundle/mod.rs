//! # Fibre-Bundle Mechanics Simulator
//!
//! Load-strain and stress-strain curves of a bundle made of several fibre
//! types, under two models:
//!
//! - **Linear** ([`compute_linear_bundle`]): each fibre type is linear elastic
//!   up to its nominal breaking strain, where the whole sub-bundle fails at
//!   once.
//! - **Non-linear** ([`compute_nonlinear_bundle`]): a piecewise hyperelastic
//!   stress curve, per-fibre Weibull breaking strains (progressive failure),
//!   a diameter size effect and humidity scaling.
//!
//! ## Units
//!
//! Diameters are in µm, stresses in GPa, strains dimensionless. Loads are
//! reported in the units the curves have always used: the linear model's
//! load column is `GPa·µm²·1e-6`, the non-linear one `GPa·µm²·1e-3`; both
//! divide back to GPa on the stress curve.
//!
//! ## Input rows
//!
//! Fibre rows arrive as text ([`RawFibreRow`]) and are validated into typed
//! rows. A row missing a field, or with a non-numeric or non-positive value,
//! is dropped; an empty bundle yields `None`, not an error. The non-linear
//! model also drops rows whose humidity scaling leaves a non-positive
//! break value, and refuses counts above [`MAX_SAMPLED_FIBRES`].
//!
//! ## Example
//!
//! ```rust
//! use mech_core::bundle::{compute_linear_bundle, RawFibreRow};
//!
//! let rows = vec![RawFibreRow::linear("Dragline", "100", "5", "2", "0.2")];
//! let result = compute_linear_bundle(&rows).unwrap();
//! assert_eq!(result.summary.total_fibres, 100);
//! assert!((result.summary.total_area - 1963.5).abs() < 0.1);
//! ```

mod humidity;
mod hyperelastic;
mod io;
mod linear;
mod nonlinear;
mod weibull;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{MechError, MechResult};

pub use humidity::{HumidityEffect, HumidityParams};
pub use hyperelastic::HyperelasticParams;
pub use io::{
    export_fibre_csv, export_fibre_json, import_fibre_csv, import_fibre_json, plot_data_csv, plot_data_rows, FibreImport, PlotDataRow,
};
pub use linear::{compute_linear_bundle, compute_linear_bundle_with, LinearBundleResult, LinearBundleSummary, LinearFibre, LinearFibreSummary};
pub use nonlinear::{
    compute_nonlinear_bundle, compute_nonlinear_bundle_seeded, NonLinearBundleResult, NonLinearBundleSummary,
    IntactSeries, NonLinearFibre, NonLinearFibreSummary, NonLinearModel,
};
pub use weibull::{diameter_effect, sample_breaking_strains, scale_for_median, strain_histogram, WeibullHistogram, WeibullParams};

/// Sampling resolution shared by both models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOptions {
    /// Points on the strain axis, endpoints included
    #[serde(default = "default_strain_points")]
    pub strain_points: usize,
    /// Equal-width bins of the breaking-strain histogram
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

fn default_strain_points() -> usize {
    1000
}

fn default_histogram_bins() -> usize {
    20
}

impl Default for BundleOptions {
    fn default() -> Self {
        BundleOptions {
            strain_points: default_strain_points(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

impl BundleOptions {
    pub fn validate(&self) -> MechResult<()> {
        if self.strain_points < 2 {
            return Err(MechError::invalid_input(
                "strainPoints",
                self.strain_points.to_string(),
                "At least two strain points are needed",
            ));
        }
        if self.histogram_bins == 0 {
            return Err(MechError::invalid_input("histogramBins", "0", "At least one histogram bin is needed"));
        }
        Ok(())
    }
}

/// A fibre row as typed into a form or read from a file.
///
/// Numeric fields stay text until validation so that blank or malformed
/// entries can be dropped instead of failing the whole import.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFibreRow {
    #[serde(default, alias = "type")]
    pub name: String,
    #[serde(default, alias = "count", deserialize_with = "lenient_text")]
    pub num_fibres: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub diameter: String,
    #[serde(default, alias = "stress", deserialize_with = "lenient_text")]
    pub stress_at_break: String,
    #[serde(default, alias = "strain", deserialize_with = "lenient_text")]
    pub strain_at_break: String,
    #[serde(default, alias = "refDiameter", deserialize_with = "lenient_text")]
    pub reference_diameter: String,
    #[serde(default, alias = "humidity", deserialize_with = "lenient_text")]
    pub humidity_value: String,
}

impl RawFibreRow {
    /// A row for the linear model.
    pub fn linear(name: &str, num_fibres: &str, diameter: &str, stress_at_break: &str, strain_at_break: &str) -> Self {
        RawFibreRow {
            name: name.to_string(),
            num_fibres: num_fibres.to_string(),
            diameter: diameter.to_string(),
            stress_at_break: stress_at_break.to_string(),
            strain_at_break: strain_at_break.to_string(),
            reference_diameter: String::new(),
            humidity_value: String::new(),
        }
    }

    /// A row for the non-linear model.
    pub fn nonlinear(linear: RawFibreRow, reference_diameter: &str, humidity_value: &str) -> Self {
        RawFibreRow {
            reference_diameter: reference_diameter.to_string(),
            humidity_value: humidity_value.to_string(),
            ..linear
        }
    }

    /// Typed row for the linear model, or `None` if any field is unusable.
    pub fn validate_linear(&self) -> Option<FibreType> {
        Some(FibreType {
            name: self.name.clone(),
            num_fibres: parse_count(&self.num_fibres)?,
            diameter: parse_positive(&self.diameter)?,
            stress_at_break: parse_positive(&self.stress_at_break)?,
            strain_at_break: parse_positive(&self.strain_at_break)?,
        })
    }

    /// Typed row for the non-linear model.
    ///
    /// Additionally needs a positive reference diameter and a humidity in
    /// `(0, 100]` %RH.
    pub fn validate_nonlinear(&self) -> Option<NonLinearFibreType> {
        let humidity = parse_positive(&self.humidity_value).filter(|h| *h <= 100.0)?;
        Some(NonLinearFibreType {
            fibre: self.validate_linear()?,
            reference_diameter: parse_positive(&self.reference_diameter)?,
            humidity,
        })
    }
}

/// A validated fibre type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibreType {
    pub name: String,
    pub num_fibres: u32,
    /// µm
    pub diameter: f64,
    /// GPa
    pub stress_at_break: f64,
    pub strain_at_break: f64,
}

impl FibreType {
    /// Cross-section of one fibre, µm².
    pub fn area(&self) -> f64 {
        crate::cross_section::diameter_to_area(self.diameter)
    }

    /// Cross-section of all fibres of this type, µm².
    pub fn bundle_area(&self) -> f64 {
        f64::from(self.num_fibres) * self.area()
    }
}

/// A validated fibre type for the non-linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearFibreType {
    #[serde(flatten)]
    pub fibre: FibreType,
    /// µm
    pub reference_diameter: f64,
    /// %RH
    pub humidity: f64,
}

/// Load carried by one fibre type across the strain axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSeries {
    pub name: String,
    pub load: Vec<f64>,
}

/// Curves shared by both models, all sampled on `strain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleCurves {
    pub strain: Vec<f64>,
    pub fibre_loads: Vec<LoadSeries>,
    pub total_load: Vec<f64>,
    /// GPa
    pub stress: Vec<f64>,
}

impl BundleCurves {
    /// Index and value of the first maximum of the total load.
    pub fn max_load(&self) -> (usize, f64) {
        self.total_load
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, load)| if load > best.1 { (i, load) } else { best })
    }

    /// Area under the total load curve.
    pub fn energy(&self) -> f64 {
        trapezoid(&self.strain, &self.total_load)
    }
}

/// `n` evenly spaced points from 0 to `max_strain`, both included.
pub fn strain_axis(max_strain: f64, n: usize) -> Vec<f64> {
    let denom = n.saturating_sub(1).max(1) as f64;
    (0..n).map(|i| i as f64 * max_strain / denom).collect()
}

/// Trapezoidal integral of `y` over `x`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// Positive finite float, or `None`.
fn parse_positive(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Largest fibre count per row the non-linear model samples.
pub const MAX_SAMPLED_FIBRES: u32 = 1_000_000;

/// Reject rows asking for more than [`MAX_SAMPLED_FIBRES`] sampled fibres.
pub(crate) fn check_sampled_counts(rows: &[RawFibreRow]) -> MechResult<()> {
    for row in rows {
        let count = row.num_fibres.trim().parse::<f64>().ok().filter(|v| !v.is_nan());
        if let Some(count) = count.filter(|v| v.trunc() > f64::from(MAX_SAMPLED_FIBRES)) {
            return Err(MechError::invalid_input(
                "numFibres",
                count.to_string(),
                format!("{} has more than {MAX_SAMPLED_FIBRES} fibres to sample", row.name),
            ));
        }
    }
    Ok(())
}

/// Positive integer count; a trailing fraction is truncated (`"3.7"` → 3).
fn parse_count(text: &str) -> Option<u32> {
    let value = text.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let count = value.trunc();
    (count >= 1.0 && count <= f64::from(u32::MAX)).then_some(count as u32)
}

/// Accept JSON strings or numbers for text fields.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_linear_row() {
        let row = RawFibreRow::linear("A", "100", "5", "2", "0.2");
        let fibre = row.validate_linear().unwrap();
        assert_eq!(fibre.num_fibres, 100);
        assert!((fibre.area() - 19.635).abs() < 1e-3);
        assert!((fibre.bundle_area() - 1963.495).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_rows_are_discarded() {
        assert!(RawFibreRow::linear("A", "", "5", "2", "0.2").validate_linear().is_none());
        assert!(RawFibreRow::linear("A", "0", "5", "2", "0.2").validate_linear().is_none());
        assert!(RawFibreRow::linear("A", "10", "abc", "2", "0.2").validate_linear().is_none());
        assert!(RawFibreRow::linear("A", "10", "5", "-2", "0.2").validate_linear().is_none());
        assert!(RawFibreRow::linear("A", "10", "5", "2", "NaN").validate_linear().is_none());
    }

    #[test]
    fn test_validate_nonlinear_row() {
        let base = RawFibreRow::linear("A", "10", "5", "2", "0.2");
        assert!(RawFibreRow::nonlinear(base.clone(), "5", "50").validate_nonlinear().is_some());
        assert!(RawFibreRow::nonlinear(base.clone(), "0", "50").validate_nonlinear().is_none());
        assert!(RawFibreRow::nonlinear(base.clone(), "5", "").validate_nonlinear().is_none());
        assert!(RawFibreRow::nonlinear(base.clone(), "5", "0").validate_nonlinear().is_none());
        assert!(RawFibreRow::nonlinear(base, "5", "120").validate_nonlinear().is_none());
    }

    #[test]
    fn test_count_parsing() {
        assert_eq!(parse_count("3.7"), Some(3));
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("0.5"), None);
    }

    #[test]
    fn test_sampled_count_limit() {
        let ok = RawFibreRow::linear("A", "1000000", "5", "2", "0.2");
        assert!(check_sampled_counts(&[ok]).is_ok());
        let typo = RawFibreRow::linear("B", "4000000000", "5", "2", "0.2");
        let err = check_sampled_counts(&[typo]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        let incomplete = RawFibreRow::linear("C", "", "5", "2", "0.2");
        assert!(check_sampled_counts(&[incomplete]).is_ok());
    }

    #[test]
    fn test_strain_axis_endpoints() {
        let axis = strain_axis(0.3, 1000);
        assert_eq!(axis.len(), 1000);
        assert_eq!(axis[0], 0.0);
        assert!((axis[999] - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_trapezoid_triangle() {
        // Load rises linearly to 2 at x = 1 and drops to zero at the next sample
        let x = vec![0.0, 0.5, 1.0, 1.5];
        let y = vec![0.0, 1.0, 2.0, 0.0];
        let expected = 0.5 * 0.5 * 1.0 + 0.5 * 0.5 * 3.0 + 0.5 * 0.5 * 2.0;
        assert!((trapezoid(&x, &y) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_row_json_aliases() {
        let json = r#"{"type": "Silk", "count": 4, "diameter": "3.5", "stress": 1.2, "strain": 0.25, "refDiameter": 3, "humidity": 60}"#;
        let row: RawFibreRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.name, "Silk");
        assert_eq!(row.num_fibres, "4");
        let fibre = row.validate_nonlinear().unwrap();
        assert_eq!(fibre.humidity, 60.0);
        assert_eq!(fibre.reference_diameter, 3.0);
    }

    #[test]
    fn test_max_load_first_maximum() {
        let curves = BundleCurves {
            strain: vec![0.0, 0.1, 0.2, 0.3],
            fibre_loads: Vec::new(),
            total_load: vec![0.0, 2.0, 2.0, 1.0],
            stress: vec![0.0; 4],
        };
        assert_eq!(curves.max_load(), (1, 2.0));
    }
}
