//! Linear-elastic bundle with synchronous failure at the nominal breaking strain.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{strain_axis, BundleCurves, BundleOptions, FibreType, LoadSeries, RawFibreRow};
use crate::errors::MechResult;

/// Strain margin added past the largest breaking strain.
const STRAIN_MARGIN: f64 = 0.1;

/// A fibre type prepared for the linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFibre {
    #[serde(flatten)]
    pub fibre: FibreType,
    /// Cross-section of one fibre, µm²
    pub area: f64,
}

impl LinearFibre {
    pub fn new(fibre: FibreType) -> Self {
        let area = fibre.area();
        LinearFibre { fibre, area }
    }

    /// Load of the whole sub-bundle at `strain`; exactly zero past break.
    pub fn load_at(&self, strain: f64) -> f64 {
        if strain <= self.fibre.strain_at_break {
            let stiffness = self.fibre.stress_at_break / self.fibre.strain_at_break;
            f64::from(self.fibre.num_fibres) * self.area * stiffness * strain * 1e-6
        } else {
            0.0
        }
    }
}

/// Per-fibre-type line of the linear summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFibreSummary {
    pub name: String,
    pub num_fibres: u32,
    pub diameter: f64,
    pub area: f64,
    pub total_area: f64,
    /// Share of the bundle cross-section, %
    pub bundle_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearBundleSummary {
    pub total_fibres: u64,
    /// µm²
    pub total_area: f64,
    pub fibres: Vec<LinearFibreSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearBundleResult {
    pub curves: BundleCurves,
    pub summary: LinearBundleSummary,
}

/// Linear bundle with default sampling.
pub fn compute_linear_bundle(rows: &[RawFibreRow]) -> Option<LinearBundleResult> {
    // Default options are always valid
    compute_linear_bundle_with(rows, &BundleOptions::default()).ok().flatten()
}

/// Linear bundle with explicit sampling options.
///
/// Rows that fail validation are dropped; `Ok(None)` when none remain.
pub fn compute_linear_bundle_with(rows: &[RawFibreRow], options: &BundleOptions) -> MechResult<Option<LinearBundleResult>> {
    options.validate()?;

    let fibres: Vec<LinearFibre> = rows
        .iter()
        .filter_map(|row| {
            let validated = row.validate_linear();
            if validated.is_none() {
                debug!(name = %row.name, "Discarding incomplete fibre row");
            }
            validated.map(LinearFibre::new)
        })
        .collect();
    if fibres.is_empty() {
        return Ok(None);
    }

    let max_strain = fibres
        .iter()
        .map(|f| f.fibre.strain_at_break)
        .fold(f64::NEG_INFINITY, f64::max)
        + STRAIN_MARGIN;
    let strain = strain_axis(max_strain, options.strain_points);
    let total_area: f64 = fibres.iter().map(|f| f.fibre.bundle_area()).sum();

    let fibre_loads: Vec<LoadSeries> = fibres
        .par_iter()
        .map(|f| LoadSeries {
            name: f.fibre.name.clone(),
            load: strain.iter().map(|s| f.load_at(*s)).collect(),
        })
        .collect();

    let mut total_load = vec![0.0; strain.len()];
    for series in &fibre_loads {
        for (total, load) in total_load.iter_mut().zip(&series.load) {
            *total += load;
        }
    }
    let stress = total_load.iter().map(|load| load * 1e6 / total_area).collect();

    let summary = LinearBundleSummary {
        total_fibres: fibres.iter().map(|f| u64::from(f.fibre.num_fibres)).sum(),
        total_area,
        fibres: fibres
            .iter()
            .map(|f| LinearFibreSummary {
                name: f.fibre.name.clone(),
                num_fibres: f.fibre.num_fibres,
                diameter: f.fibre.diameter,
                area: f.area,
                total_area: f.fibre.bundle_area(),
                bundle_percentage: f.fibre.bundle_area() / total_area * 100.0,
            })
            .collect(),
    };

    debug!(fibre_types = fibres.len(), total_area, "Computed linear bundle");
    Ok(Some(LinearBundleResult {
        curves: BundleCurves {
            strain,
            fibre_loads,
            total_load,
            stress,
        },
        summary,
    }))
}
