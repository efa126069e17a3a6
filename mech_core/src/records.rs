//! # Trait and Experiment Records
//!
//! Shapes of the stored documents the engine reads and rewrites. Persistence
//! belongs to the caller: every operation here takes a record by reference
//! and returns an updated copy (or mutates one the caller owns), never
//! touching storage itself.
//!
//! Field names follow the stored JSON (`_id`, `type`, camelCase elsewhere).
//!
//! ```rust
//! use mech_core::records::TraitRecord;
//!
//! let json = r#"{"_id": "t1", "type": "diameter", "measurement": 5.0, "unit": "µm", "nfibres": 2}"#;
//! let record: TraitRecord = serde_json::from_str(json).unwrap();
//! assert_eq!(record.nfibres.as_deref(), Some("2"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::cross_section::DiameterConversion;
use crate::units::Measurement;

/// A stored trait measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "type")]
    pub trait_type: String,

    #[serde(default)]
    pub measurement: Option<f64>,

    #[serde(default)]
    pub unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Standard deviation, in the trait's unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,

    /// Fibre count as entered: an integer, a range like "2-4", or "bundle"
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub nfibres: Option<String>,

    /// Provenance of the last diameter-driven rescale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter_conversion: Option<DiameterConversion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_change_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub logbook: Vec<String>,
}

impl TraitRecord {
    /// A bare quantitative record, mostly useful in tests and demos.
    pub fn new(id: impl Into<String>, trait_type: impl Into<String>, measurement: f64, unit: impl Into<String>) -> Self {
        TraitRecord {
            id: id.into(),
            trait_type: trait_type.into(),
            measurement: Some(measurement),
            unit: unit.into(),
            sample_id: None,
            experiment_id: None,
            date: None,
            std: None,
            nfibres: None,
            diameter_conversion: None,
            recent_change_date: None,
            logbook: Vec::new(),
        }
    }

    pub fn with_nfibres(mut self, nfibres: impl Into<String>) -> Self {
        self.nfibres = Some(nfibres.into());
        self
    }

    pub fn with_experiment(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    pub fn with_std(mut self, std: f64) -> Self {
        self.std = Some(std);
        self
    }

    /// The measurement paired with its unit, if a value is present.
    pub fn as_measurement(&self) -> Option<Measurement> {
        self.measurement.map(|value| Measurement::new(value, self.unit.clone()))
    }

    /// Append a timestamped audit line and bump `recentChangeDate`.
    pub fn log_change(&mut self, now: DateTime<Utc>, message: impl AsRef<str>) {
        self.logbook.push(format!("{}: {}", now.to_rfc3339(), message.as_ref()));
        self.recent_change_date = Some(now);
    }
}

/// Scalar mechanical results of one tensile experiment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentMechanics {
    #[serde(default)]
    pub stress_at_break: f64,
    #[serde(default)]
    pub toughness: f64,
    #[serde(default)]
    pub offset_yield_stress: f64,
    #[serde(default)]
    pub modulus: f64,
    #[serde(default)]
    pub specimen_diameter: f64,
}

/// A tensile experiment attached to a sample, with its raw stress series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,

    #[serde(flatten)]
    pub mechanics: ExperimentMechanics,

    /// Values before the first diameter conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_mechanics: Option<ExperimentMechanics>,

    #[serde(default)]
    pub engineering_stress: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_engineering_stress: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_conversion_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_conversion_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub logbook: Vec<String>,
}

impl ExperimentRecord {
    pub fn new(id: impl Into<String>, mechanics: ExperimentMechanics, engineering_stress: Vec<f64>) -> Self {
        ExperimentRecord {
            id: id.into(),
            sample_id: None,
            mechanics,
            original_mechanics: None,
            engineering_stress,
            original_engineering_stress: None,
            last_conversion_ratio: None,
            last_conversion_date: None,
            version: 0,
            logbook: Vec::new(),
        }
    }

    /// True once a diameter conversion has been applied and not reset.
    pub fn is_converted(&self) -> bool {
        self.original_mechanics.is_some()
    }
}

/// Accept `"3"`, `3` or `"2-4"` for fields users type as free text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_record_shape() {
        let record = TraitRecord::new("t1", "stressAtBreak", 1.2, "GPa").with_experiment("e1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "t1");
        assert_eq!(json["type"], "stressAtBreak");
        assert_eq!(json["experimentId"], "e1");
        assert!(json.get("diameterConversion").is_none());
    }

    #[test]
    fn test_nfibres_accepts_text_and_numbers() {
        let range: TraitRecord = serde_json::from_str(r#"{"_id": "a", "type": "diameter", "nfibres": "2-4"}"#).unwrap();
        assert_eq!(range.nfibres.as_deref(), Some("2-4"));
        assert!(range.measurement.is_none());

        let missing: TraitRecord = serde_json::from_str(r#"{"_id": "b", "type": "diameter", "nfibres": null}"#).unwrap();
        assert!(missing.nfibres.is_none());
    }

    #[test]
    fn test_log_change() {
        let mut record = TraitRecord::new("t1", "length", 2.0, "cm");
        let now = Utc::now();
        record.log_change(now, "Unit converted from cm to mm (2 → 20)");
        assert_eq!(record.logbook.len(), 1);
        assert!(record.logbook[0].ends_with("Unit converted from cm to mm (2 → 20)"));
        assert_eq!(record.recent_change_date, Some(now));
    }

    #[test]
    fn test_experiment_flattened_mechanics() {
        let json = r#"{"_id": "e1", "stressAtBreak": 1.1, "modulus": 8.0, "specimenDiameter": 4.0, "engineeringStress": [0.1, 0.2]}"#;
        let experiment: ExperimentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(experiment.mechanics.stress_at_break, 1.1);
        assert_eq!(experiment.mechanics.toughness, 0.0);
        assert_eq!(experiment.engineering_stress, vec![0.1, 0.2]);
        assert!(!experiment.is_converted());
    }
}
