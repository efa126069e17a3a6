//! Non-linear bundle: hyperelastic fibres with Weibull-distributed breaking
//! strains, a diameter size effect and humidity scaling.
//!
//! Every fibre of a type follows the same hyperelastic curve, stretched to
//! the type's effective break point. Individual fibres break at their own
//! sampled strain, so the bundle fails progressively.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    check_sampled_counts, diameter_effect, sample_breaking_strains, strain_axis, strain_histogram, BundleCurves, BundleOptions,
    HumidityEffect, HumidityParams, HyperelasticParams, LoadSeries, NonLinearFibreType, RawFibreRow,
    WeibullHistogram, WeibullParams,
};
use crate::errors::MechResult;
use crate::settings::BundleDefaults;

/// Strain axis extends this far past the largest effective breaking strain.
const STRAIN_HEADROOM: f64 = 1.2;

/// Parameters of the non-linear model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearModel {
    #[serde(default)]
    pub hyperelastic: HyperelasticParams,
    #[serde(default)]
    pub humidity: HumidityParams,
    #[serde(default)]
    pub weibull: WeibullParams,
    #[serde(default)]
    pub options: BundleOptions,
}

impl NonLinearModel {
    pub fn validate(&self) -> MechResult<()> {
        self.hyperelastic.validate()?;
        self.humidity.validate()?;
        self.weibull.validate()?;
        self.options.validate()
    }
}

impl From<&BundleDefaults> for NonLinearModel {
    fn from(defaults: &BundleDefaults) -> Self {
        NonLinearModel {
            hyperelastic: defaults.hyperelastic,
            humidity: defaults.humidity,
            weibull: defaults.weibull,
            options: defaults.options,
        }
    }
}

/// A fibre type with humidity and size effects applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearFibre {
    #[serde(flatten)]
    pub fibre: NonLinearFibreType,
    /// µm²
    pub area: f64,
    pub humidity_effect: HumidityEffect,
    pub diameter_effect: f64,
    /// GPa
    pub effective_stress_at_break: f64,
    pub effective_strain_at_break: f64,
}

impl NonLinearFibre {
    pub fn new(fibre: NonLinearFibreType, model: &NonLinearModel) -> Self {
        let humidity_effect = model.humidity.effect(fibre.humidity);
        let size = diameter_effect(
            fibre.fibre.diameter,
            fibre.reference_diameter,
            model.weibull.scaling_exponent,
        );
        NonLinearFibre {
            area: fibre.fibre.area(),
            effective_stress_at_break: fibre.fibre.stress_at_break * humidity_effect.stress_scale_factor,
            effective_strain_at_break: fibre.fibre.strain_at_break * humidity_effect.strain_scale_factor * size,
            humidity_effect,
            diameter_effect: size,
            fibre,
        }
    }

    /// Both effective break values are finite and positive.
    ///
    /// Humidity far below the reference can push a scale factor to zero
    /// or below, leaving nothing to sample from.
    pub fn is_usable(&self) -> bool {
        [self.effective_stress_at_break, self.effective_strain_at_break]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// Stress (GPa) of an intact fibre at `strain`.
    pub fn stress_at(&self, strain: f64, params: &HyperelasticParams) -> f64 {
        params.stress(strain, self.effective_strain_at_break, self.effective_stress_at_break)
    }
}

/// Number of fibres still intact at `strain`, given sorted breaking strains.
fn intact_count(breaking_strains: &[f64], strain: f64) -> usize {
    breaking_strains.len() - breaking_strains.partition_point(|b| *b < strain)
}

/// Share of intact fibres of one type across the strain axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntactSeries {
    pub name: String,
    pub fraction: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearFibreSummary {
    pub name: String,
    pub num_fibres: u32,
    pub diameter: f64,
    pub reference_diameter: f64,
    pub humidity: f64,
    pub area: f64,
    pub total_area: f64,
    pub bundle_percentage: f64,
    /// Stress at break before the humidity factor, GPa
    pub base_stress: f64,
    pub adjusted_stress: f64,
    /// Strain at break with the size effect but without humidity
    pub base_strain: f64,
    pub adjusted_strain: f64,
    pub humidity_effects: HumidityEffect,
    pub diameter_effect: f64,
}

impl From<&NonLinearFibre> for NonLinearFibreSummary {
    fn from(f: &NonLinearFibre) -> Self {
        NonLinearFibreSummary {
            name: f.fibre.fibre.name.clone(),
            num_fibres: f.fibre.fibre.num_fibres,
            diameter: f.fibre.fibre.diameter,
            reference_diameter: f.fibre.reference_diameter,
            humidity: f.fibre.humidity,
            area: f.area,
            total_area: f.fibre.fibre.bundle_area(),
            bundle_percentage: 0.0,
            base_stress: f.effective_stress_at_break / f.humidity_effect.stress_scale_factor,
            adjusted_stress: f.effective_stress_at_break,
            base_strain: f.effective_strain_at_break / f.humidity_effect.strain_scale_factor,
            adjusted_strain: f.effective_strain_at_break,
            humidity_effects: f.humidity_effect,
            diameter_effect: f.diameter_effect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearBundleSummary {
    pub total_fibres: u64,
    /// µm²
    pub total_area: f64,
    /// Peak total load, scaled by 1e6
    pub max_load: f64,
    pub strain_at_max_load: f64,
    /// Area under the load curve, scaled by 1e6
    pub energy_to_break: f64,
    pub fibres: Vec<NonLinearFibreSummary>,
}

impl NonLinearBundleSummary {
    /// Peak and energy of `curves`, plus each fibre type's share of `total_area`.
    pub fn new(curves: &BundleCurves, fibres: &[NonLinearFibre], total_area: f64) -> Self {
        let (peak_index, peak_load) = curves.max_load();
        NonLinearBundleSummary {
            total_fibres: fibres.iter().map(|f| u64::from(f.fibre.fibre.num_fibres)).sum(),
            total_area,
            max_load: peak_load * 1e6,
            strain_at_max_load: curves.strain.get(peak_index).copied().unwrap_or(0.0),
            energy_to_break: curves.energy() * 1e6,
            fibres: fibres
                .iter()
                .map(|f| NonLinearFibreSummary {
                    bundle_percentage: f.fibre.fibre.bundle_area() / total_area * 100.0,
                    ..NonLinearFibreSummary::from(f)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonLinearBundleResult {
    pub curves: BundleCurves,
    pub histograms: Vec<WeibullHistogram>,
    pub intact_fractions: Vec<IntactSeries>,
    pub summary: NonLinearBundleSummary,
}

/// Run the non-linear model, drawing breaking strains from `rng`.
///
/// Invalid rows are dropped; `Ok(None)` when none remain. Invalid model
/// parameters are an error.
pub fn compute_nonlinear_bundle<R: Rng + ?Sized>(
    rows: &[RawFibreRow],
    model: &NonLinearModel,
    rng: &mut R,
) -> MechResult<Option<NonLinearBundleResult>> {
    model.validate()?;
    check_sampled_counts(rows)?;

    let fibres: Vec<NonLinearFibre> = rows
        .iter()
        .filter_map(|row| {
            let validated = row.validate_nonlinear();
            if validated.is_none() {
                debug!(name = %row.name, "Discarding incomplete fibre row");
            }
            validated.map(|fibre| NonLinearFibre::new(fibre, model))
        })
        .filter(|fibre| {
            let usable = fibre.is_usable();
            if !usable {
                debug!(
                    name = %fibre.fibre.fibre.name,
                    stress = fibre.effective_stress_at_break,
                    strain = fibre.effective_strain_at_break,
                    "Discarding fibre row with non-positive effective break values"
                );
            }
            usable
        })
        .collect();
    if fibres.is_empty() {
        return Ok(None);
    }

    let max_strain = fibres
        .iter()
        .map(|f| f.effective_strain_at_break)
        .fold(f64::NEG_INFINITY, f64::max)
        * STRAIN_HEADROOM;
    let strain = strain_axis(max_strain, model.options.strain_points);
    let total_area: f64 = fibres.iter().map(|f| f.fibre.fibre.bundle_area()).sum();

    // Draw sequentially so a seed fixes every fibre's breaking strains
    let mut breaking_strains = Vec::with_capacity(fibres.len());
    for fibre in &fibres {
        breaking_strains.push(sample_breaking_strains(
            fibre.effective_strain_at_break,
            model.weibull.weibull_shape,
            fibre.fibre.fibre.num_fibres as usize,
            rng,
        )?);
    }

    let histograms = fibres
        .iter()
        .zip(&breaking_strains)
        .map(|(f, breaks)| strain_histogram(&f.fibre.fibre.name, breaks, max_strain, model.options.histogram_bins))
        .collect();

    let per_fibre: Vec<(LoadSeries, IntactSeries)> = fibres
        .par_iter()
        .zip(breaking_strains.par_iter())
        .map(|(f, breaks)| {
            let counts: Vec<usize> = strain.iter().map(|s| intact_count(breaks, *s)).collect();
            let load = strain
                .iter()
                .zip(&counts)
                .map(|(s, intact)| *intact as f64 * f.area * f.stress_at(*s, &model.hyperelastic) * 1e-3)
                .collect();
            let total = breaks.len().max(1) as f64;
            let fraction = counts.iter().map(|c| *c as f64 / total).collect();
            let name = f.fibre.fibre.name.clone();
            (LoadSeries { name: name.clone(), load }, IntactSeries { name, fraction })
        })
        .collect();
    let (fibre_loads, intact_fractions): (Vec<LoadSeries>, Vec<IntactSeries>) = per_fibre.into_iter().unzip();

    let mut total_load = vec![0.0; strain.len()];
    for series in &fibre_loads {
        for (total, load) in total_load.iter_mut().zip(&series.load) {
            *total += load;
        }
    }
    let stress = total_load.iter().map(|load| load * 1e3 / total_area).collect();

    let curves = BundleCurves {
        strain,
        fibre_loads,
        total_load,
        stress,
    };
    let summary = NonLinearBundleSummary::new(&curves, &fibres, total_area);

    info!(
        fibre_types = fibres.len(),
        max_load = summary.max_load,
        strain_at_max_load = summary.strain_at_max_load,
        "Computed non-linear bundle"
    );
    Ok(Some(NonLinearBundleResult {
        curves,
        histograms,
        intact_fractions,
        summary,
    }))
}

/// Run the non-linear model with a reproducible generator.
pub fn compute_nonlinear_bundle_seeded(
    rows: &[RawFibreRow],
    model: &NonLinearModel,
    seed: u64,
) -> MechResult<Option<NonLinearBundleResult>> {
    let mut rng = StdRng::seed_from_u64(seed);
    compute_nonlinear_bundle(rows, model, &mut rng)
}
