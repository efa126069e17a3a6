//! Piecewise hyperelastic stress curve with yield and hardening regions.
//!
//! With `x = strain / strainAtBreak`:
//!
//! ```text
//! x < yield            σ = σ_b · α1·x
//! yield ≤ x < hard     σ = σ_b · (σ_y + α2·(x - yield))
//! x ≥ hard             σ = σ_b · (σ_h + α3·(x - hard)² + α4·(x - hard)³)
//! ```
//!
//! where `σ_y = α1·yield` and `σ_h = σ_y + α2·(hard - yield)`. The curve is
//! continuous at both boundaries; its slope generally is not.

use serde::{Deserialize, Serialize};

use crate::errors::{MechError, MechResult};

/// Shape of the hyperelastic curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HyperelasticParams {
    /// Initial stiffness
    pub alpha1: f64,
    /// Post-yield slope
    pub alpha2: f64,
    /// Quadratic hardening
    pub alpha3: f64,
    /// Cubic hardening
    pub alpha4: f64,
    /// Normalized strain where yielding starts
    pub yield_point: f64,
    /// Normalized strain where hardening starts
    pub hard_point: f64,
}

impl Default for HyperelasticParams {
    fn default() -> Self {
        HyperelasticParams {
            alpha1: 1.0,
            alpha2: 0.3,
            alpha3: 1.2,
            alpha4: 1.2,
            yield_point: 0.2,
            hard_point: 0.4,
        }
    }
}

impl HyperelasticParams {
    pub fn validate(&self) -> MechResult<()> {
        let alphas = [
            ("alpha1", self.alpha1),
            ("alpha2", self.alpha2),
            ("alpha3", self.alpha3),
            ("alpha4", self.alpha4),
        ];
        for (field, value) in alphas {
            if !value.is_finite() || value < 0.0 {
                return Err(MechError::invalid_input(field, value.to_string(), "Must be a non-negative number"));
            }
        }
        for (field, value) in [("yieldPoint", self.yield_point), ("hardPoint", self.hard_point)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MechError::invalid_input(field, value.to_string(), "Must lie in [0, 1]"));
            }
        }
        if self.yield_point >= self.hard_point {
            return Err(MechError::invalid_input(
                "hardPoint",
                self.hard_point.to_string(),
                format!("Must exceed yieldPoint ({})", self.yield_point),
            ));
        }
        Ok(())
    }

    /// Normalized stress at the yield point.
    pub fn yield_stress(&self) -> f64 {
        self.alpha1 * self.yield_point
    }

    /// Normalized stress at the hardening point.
    pub fn hard_point_stress(&self) -> f64 {
        self.yield_stress() + self.alpha2 * (self.hard_point - self.yield_point)
    }

    /// Stress-to-break ratio at normalized strain `x`.
    pub fn normalized_stress(&self, x: f64) -> f64 {
        if x < self.yield_point {
            x * self.alpha1
        } else if x < self.hard_point {
            self.yield_stress() + self.alpha2 * (x - self.yield_point)
        } else {
            let dx = x - self.hard_point;
            self.hard_point_stress() + self.alpha3 * dx.powi(2) + self.alpha4 * dx.powi(3)
        }
    }

    /// Stress (GPa) of a fibre with the given break point at `strain`.
    pub fn stress(&self, strain: f64, strain_at_break: f64, stress_at_break: f64) -> f64 {
        stress_at_break * self.normalized_stress(strain / strain_at_break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(HyperelasticParams::default().validate().is_ok());
    }

    #[test]
    fn test_continuity_at_boundaries() {
        let params = HyperelasticParams::default();
        for boundary in [params.yield_point, params.hard_point] {
            let below = params.normalized_stress(boundary - 1e-9);
            let at = params.normalized_stress(boundary);
            let above = params.normalized_stress(boundary + 1e-9);
            assert!((below - at).abs() < 1e-8, "left limit at {boundary}");
            assert!((above - at).abs() < 1e-8, "right limit at {boundary}");
        }
    }

    #[test]
    fn test_region_values() {
        let params = HyperelasticParams::default();
        assert!((params.normalized_stress(0.1) - 0.1).abs() < 1e-12);
        assert!((params.normalized_stress(0.3) - (0.2 + 0.3 * 0.1)).abs() < 1e-12);
        // x = 1: 0.26 + 1.2·0.36 + 1.2·0.216
        assert!((params.normalized_stress(1.0) - 0.9512).abs() < 1e-12);
        assert!((params.stress(0.1, 0.2, 2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params() {
        let swapped = HyperelasticParams {
            yield_point: 0.5,
            hard_point: 0.4,
            ..HyperelasticParams::default()
        };
        assert_eq!(swapped.validate().unwrap_err().error_code(), "INVALID_INPUT");

        let negative = HyperelasticParams {
            alpha3: -1.0,
            ..HyperelasticParams::default()
        };
        assert!(negative.validate().is_err());
    }
}
