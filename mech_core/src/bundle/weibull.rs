//! Weibull breaking-strain sampling and the weakest-link size effect.

use rand::Rng;
use rand_distr::{Distribution, Weibull};
use serde::{Deserialize, Serialize};

use crate::errors::{MechError, MechResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeibullParams {
    /// Weibull modulus; larger means less scatter
    pub weibull_shape: f64,
    /// Exponent of the `(d / d_ref)` size effect on breaking strain
    pub scaling_exponent: f64,
}

impl Default for WeibullParams {
    fn default() -> Self {
        WeibullParams {
            weibull_shape: 75.0,
            scaling_exponent: -0.25,
        }
    }
}

impl WeibullParams {
    pub fn validate(&self) -> MechResult<()> {
        if !self.weibull_shape.is_finite() || self.weibull_shape <= 0.0 {
            return Err(MechError::invalid_input(
                "weibullShape",
                self.weibull_shape.to_string(),
                "Shape must be positive",
            ));
        }
        if !self.scaling_exponent.is_finite() {
            return Err(MechError::invalid_input(
                "scalingExponent",
                self.scaling_exponent.to_string(),
                "Must be a finite number",
            ));
        }
        Ok(())
    }
}

/// `(diameter / reference)^exponent`; thinner fibres have fewer flaws.
pub fn diameter_effect(diameter: f64, reference_diameter: f64, scaling_exponent: f64) -> f64 {
    (diameter / reference_diameter).powf(scaling_exponent)
}

/// Weibull scale giving the requested median: `median / ln(2)^(1/shape)`.
pub fn scale_for_median(median: f64, shape: f64) -> f64 {
    median / std::f64::consts::LN_2.powf(1.0 / shape)
}

/// Draw `count` breaking strains with the given median, sorted ascending.
pub fn sample_breaking_strains<R: Rng + ?Sized>(median: f64, shape: f64, count: usize, rng: &mut R) -> MechResult<Vec<f64>> {
    let distribution = Weibull::new(scale_for_median(median, shape), shape)
        .map_err(|e| MechError::calculation_failed("weibull sampling", e.to_string()))?;
    let mut strains: Vec<f64> = (0..count).map(|_| distribution.sample(rng)).collect();
    strains.sort_by(f64::total_cmp);
    Ok(strains)
}

/// Equal-width histogram of breaking strains over `[0, max_strain]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeibullHistogram {
    pub name: String,
    pub bin_width: f64,
    pub bin_centers: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Bin sampled strains; values past `max_strain` land in the last bin.
pub fn strain_histogram(name: &str, strains: &[f64], max_strain: f64, bins: usize) -> WeibullHistogram {
    let bins = bins.max(1);
    let bin_width = max_strain / bins as f64;
    let mut counts = vec![0usize; bins];
    for strain in strains {
        let index = if bin_width > 0.0 {
            ((strain / bin_width).floor().max(0.0) as usize).min(bins - 1)
        } else {
            0
        };
        counts[index] += 1;
    }
    WeibullHistogram {
        name: name.to_string(),
        bin_width,
        bin_centers: (0..bins).map(|i| (i as f64 + 0.5) * bin_width).collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_median() {
        let mut rng = StdRng::seed_from_u64(42);
        let strains = sample_breaking_strains(0.3, 75.0, 10_000, &mut rng).unwrap();
        assert_eq!(strains.len(), 10_000);
        assert!(strains.windows(2).all(|w| w[0] <= w[1]));

        let median = 0.5 * (strains[4_999] + strains[5_000]);
        assert!((median - 0.3).abs() / 0.3 < 0.02, "median {median}");
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = sample_breaking_strains(0.2, 10.0, 50, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = sample_breaking_strains(0.2, 10.0, 50, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_for_median() {
        // shape 1 is exponential: median = scale·ln 2
        assert!((scale_for_median(std::f64::consts::LN_2, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_diameter_effect() {
        assert_eq!(diameter_effect(5.0, 5.0, -0.25), 1.0);
        assert!((diameter_effect(16.0, 1.0, -0.25) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_bins() {
        let histogram = strain_histogram("A", &[0.0, 0.06, 0.97, 1.0, 2.0], 1.0, 20);
        assert_eq!(histogram.counts.len(), 20);
        assert_eq!(histogram.counts[0], 1);
        assert_eq!(histogram.counts[1], 1);
        assert_eq!(histogram.counts[19], 3);
        assert!((histogram.bin_centers[0] - 0.025).abs() < 1e-12);
        assert_eq!(histogram.counts.iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_invalid_shape() {
        let params = WeibullParams {
            weibull_shape: 0.0,
            ..WeibullParams::default()
        };
        assert!(params.validate().is_err());
    }
}
