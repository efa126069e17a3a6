//! Linear humidity scaling of fibre properties.

use serde::{Deserialize, Serialize};

use crate::errors::{MechError, MechResult};

/// Coefficients of the humidity model, per %RH away from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HumidityParams {
    /// %RH at which all factors are 1
    pub reference_humidity: f64,
    pub strain_coefficient: f64,
    pub stress_coefficient: f64,
    pub stiffness_coefficient: f64,
}

impl Default for HumidityParams {
    fn default() -> Self {
        HumidityParams {
            reference_humidity: 50.0,
            strain_coefficient: 0.005,
            stress_coefficient: 0.002,
            stiffness_coefficient: 0.005,
        }
    }
}

impl HumidityParams {
    pub fn validate(&self) -> MechResult<()> {
        if !(0.0..=100.0).contains(&self.reference_humidity) {
            return Err(MechError::invalid_input(
                "referenceHumidity",
                self.reference_humidity.to_string(),
                "Must lie in [0, 100] %RH",
            ));
        }
        let coefficients = [
            ("strainCoefficient", self.strain_coefficient),
            ("stressCoefficient", self.stress_coefficient),
            ("stiffnessCoefficient", self.stiffness_coefficient),
        ];
        for (field, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(MechError::invalid_input(field, value.to_string(), "Must be a non-negative number"));
            }
        }
        Ok(())
    }

    /// Scale factors at `humidity` %RH.
    pub fn effect(&self, humidity: f64) -> HumidityEffect {
        let delta = humidity - self.reference_humidity;
        HumidityEffect {
            strain_scale_factor: 1.0 + self.strain_coefficient * delta,
            stress_scale_factor: 1.0 - self.stress_coefficient * delta,
            stiffness_scale_factor: 1.0 - self.stiffness_coefficient * delta,
        }
    }
}

/// Humidity scale factors. Wetter fibres stretch further, break at lower
/// stress and are softer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumidityEffect {
    pub strain_scale_factor: f64,
    pub stress_scale_factor: f64,
    /// Reported only; the stress curve does not use it
    pub stiffness_scale_factor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_humidity_is_neutral() {
        let effect = HumidityParams::default().effect(50.0);
        assert_eq!(effect.strain_scale_factor, 1.0);
        assert_eq!(effect.stress_scale_factor, 1.0);
        assert_eq!(effect.stiffness_scale_factor, 1.0);
    }

    #[test]
    fn test_direction_of_effects() {
        let effect = HumidityParams::default().effect(80.0);
        assert!((effect.strain_scale_factor - 1.15).abs() < 1e-12);
        assert!((effect.stress_scale_factor - 0.94).abs() < 1e-12);
        assert!((effect.stiffness_scale_factor - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(HumidityParams::default().validate().is_ok());
        let bad = HumidityParams {
            reference_humidity: 120.0,
            ..HumidityParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
