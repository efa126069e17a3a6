//! Rescaling mechanical traits and experiments after a cross-section change.
//!
//! Stress-like values scale with `baseline area / comparison area`. Every
//! rescale records a [`DiameterConversion`] provenance holding the value
//! before the first conversion, so a reset restores it exactly instead of
//! dividing by the ratio.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::aggregate::{CrossSectionComparison, CrossSectionSelection, FibreCountOverride};
use crate::errors::{MechError, MechResult};
use crate::records::{ExperimentMechanics, ExperimentRecord, TraitRecord};

/// Trait types rescaled by a diameter conversion.
pub const MECHANICAL_TRAIT_TYPES: [&str; 3] = ["stressAtBreak", "toughness", "modulus"];

/// Group key for mechanical traits without an experiment.
pub const UNGROUPED: &str = "ungrouped";

/// A comparison-column diameter trait with its fibre counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparedDiameter {
    pub id: String,
    #[serde(rename = "fiberCounts", default, skip_serializing_if = "Option::is_none")]
    pub fibre_counts: Option<FibreCountOverride>,
}

/// Provenance stored on a trait rescaled by a diameter conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiameterConversion {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub old_diameters: Vec<String>,
    #[serde(default)]
    pub new_diameters: Vec<ComparedDiameter>,
    pub old_cross_section: f64,
    pub new_cross_section: f64,
    pub ratio: f64,
    /// Measurement before the first conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<f64>,
}

/// What a confirmed conversion will apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPlan {
    pub old_diameters: Vec<String>,
    pub new_diameters: Vec<ComparedDiameter>,
    /// Representative baseline area (avg when ranged)
    pub old_cross_section: f64,
    /// Representative comparison area (avg when ranged)
    pub new_cross_section: f64,
    pub ratio: f64,
}

impl ConversionPlan {
    pub fn from_comparison(comparison: &CrossSectionComparison, selection: &CrossSectionSelection) -> Self {
        ConversionPlan {
            old_diameters: selection.included.iter().cloned().collect(),
            new_diameters: selection
                .compared
                .iter()
                .map(|id| ComparedDiameter {
                    id: id.clone(),
                    fibre_counts: selection.fibre_counts.get(id).cloned(),
                })
                .collect(),
            old_cross_section: comparison.included.totals.representative(),
            new_cross_section: comparison.compared.totals.representative(),
            ratio: comparison.ratio,
        }
    }

    /// A plan carrying only a ratio, for callers that computed it elsewhere.
    pub fn from_ratio(ratio: f64) -> Self {
        ConversionPlan {
            old_diameters: Vec::new(),
            new_diameters: Vec::new(),
            old_cross_section: 0.0,
            new_cross_section: 0.0,
            ratio,
        }
    }

    fn validate(&self) -> MechResult<()> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(MechError::invalid_input(
                "ratio",
                self.ratio.to_string(),
                "Conversion ratio must be a positive finite number",
            ));
        }
        Ok(())
    }

    fn audit_line(&self) -> String {
        let new_ids: Vec<&str> = self.new_diameters.iter().map(|d| d.id.as_str()).collect();
        format!(
            "Old diameters: {} | New diameters: {} | Cross sections: {} → {} | Ratio: {}",
            self.old_diameters.join(", "),
            new_ids.join(", "),
            self.old_cross_section,
            self.new_cross_section,
            self.ratio
        )
    }
}

/// Rescale a value by a conversion ratio; units are unchanged.
pub fn apply_ratio(measurement: f64, ratio: f64) -> f64 {
    measurement * ratio
}

/// Return `record` rescaled by the plan's ratio, with provenance attached.
///
/// The new measurement and its provenance are set together on the returned
/// copy; the input is left untouched.
pub fn apply_ratio_to_trait(record: &TraitRecord, plan: &ConversionPlan, now: DateTime<Utc>) -> MechResult<TraitRecord> {
    plan.validate()?;
    let measurement = record
        .measurement
        .ok_or_else(|| MechError::missing_field(format!("{}.measurement", record.id)))?;

    let original_value = record
        .diameter_conversion
        .as_ref()
        .and_then(|c| c.original_value)
        .unwrap_or(measurement);
    let new_value = apply_ratio(measurement, plan.ratio);

    let mut updated = record.clone();
    updated.measurement = Some(new_value);
    updated.diameter_conversion = Some(DiameterConversion {
        date: now,
        old_diameters: plan.old_diameters.clone(),
        new_diameters: plan.new_diameters.clone(),
        old_cross_section: plan.old_cross_section,
        new_cross_section: plan.new_cross_section,
        ratio: plan.ratio,
        original_value: Some(original_value),
    });
    updated.log_change(
        now,
        format!(
            "Converted value from {measurement} to {new_value} based on diameter change | {}",
            plan.audit_line()
        ),
    );
    Ok(updated)
}

/// Undo a diameter conversion; `None` when the trait carries no provenance.
pub fn reset_trait(record: &TraitRecord, now: DateTime<Utc>) -> Option<TraitRecord> {
    let conversion = record.diameter_conversion.as_ref()?;
    let restored = match (conversion.original_value, record.measurement) {
        (Some(original), _) => Some(original),
        (None, Some(current)) if conversion.ratio != 0.0 => Some(current / conversion.ratio),
        (None, current) => current,
    };

    let mut updated = record.clone();
    updated.measurement = restored;
    updated.diameter_conversion = None;
    updated.log_change(
        now,
        format!(
            "Reset value to original measurement before diameter conversion | Previous cross-section: {} → {} | Previous ratio: {}",
            conversion.old_cross_section, conversion.new_cross_section, conversion.ratio
        ),
    );
    Some(updated)
}

pub fn is_mechanical(record: &TraitRecord) -> bool {
    MECHANICAL_TRAIT_TYPES.contains(&record.trait_type.as_str())
}

/// Experiment group key of a trait.
pub fn group_key(record: &TraitRecord) -> &str {
    record.experiment_id.as_deref().unwrap_or(UNGROUPED)
}

/// Mechanical traits grouped by experiment id.
pub fn group_mechanical_traits(records: &[TraitRecord]) -> BTreeMap<String, Vec<&TraitRecord>> {
    let mut groups: BTreeMap<String, Vec<&TraitRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| is_mechanical(r)) {
        groups.entry(group_key(record).to_string()).or_default().push(record);
    }
    groups
}

/// Mechanical traits whose experiment group is selected.
pub fn select_mechanical_traits<'a>(records: &'a [TraitRecord], groups: &BTreeSet<String>) -> Vec<&'a TraitRecord> {
    records
        .iter()
        .filter(|r| is_mechanical(r) && groups.contains(group_key(r)))
        .collect()
}

/// One row of a conversion preview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionChange {
    pub trait_id: String,
    #[serde(rename = "type")]
    pub trait_type: String,
    pub experiment_id: String,
    pub old_value: f64,
    pub new_value: f64,
    pub unit: String,
    pub percent_change: f64,
}

/// What applying `ratio` would do to each selected trait.
pub fn preview_changes(selected: &[&TraitRecord], ratio: f64) -> Vec<ConversionChange> {
    selected
        .iter()
        .filter_map(|record| {
            let old_value = record.measurement?;
            Some(ConversionChange {
                trait_id: record.id.clone(),
                trait_type: record.trait_type.clone(),
                experiment_id: record.experiment_id.clone().unwrap_or_else(|| "No Experiment".to_string()),
                old_value,
                new_value: apply_ratio(old_value, ratio),
                unit: record.unit.clone(),
                percent_change: (ratio - 1.0) * 100.0,
            })
        })
        .collect()
}

/// Rescale an experiment's mechanics and stress series.
///
/// Stresses, toughness and modulus scale with the ratio; the specimen
/// diameter scales with its inverse square root. Originals are captured on
/// the first conversion only.
pub fn rescale_experiment(experiment: &ExperimentRecord, ratio: f64, now: DateTime<Utc>) -> MechResult<ExperimentRecord> {
    ConversionPlan::from_ratio(ratio).validate()?;

    let mut updated = experiment.clone();
    if updated.original_mechanics.is_none() {
        updated.original_mechanics = Some(experiment.mechanics);
    }
    if updated.original_engineering_stress.is_none() {
        updated.original_engineering_stress = Some(experiment.engineering_stress.clone());
    }

    let m = experiment.mechanics;
    updated.mechanics = ExperimentMechanics {
        stress_at_break: m.stress_at_break * ratio,
        toughness: m.toughness * ratio,
        offset_yield_stress: m.offset_yield_stress * ratio,
        modulus: m.modulus * ratio,
        specimen_diameter: m.specimen_diameter / ratio.sqrt(),
    };
    updated.engineering_stress = experiment.engineering_stress.iter().map(|s| s * ratio).collect();
    updated.last_conversion_ratio = Some(ratio);
    updated.last_conversion_date = Some(now);
    updated.version += 1;
    updated
        .logbook
        .push(format!("{}: Updated data points based on diameter conversion | Ratio: {ratio}", now.to_rfc3339()));
    Ok(updated)
}

/// Restore an experiment's pre-conversion values; `None` if never converted.
pub fn reset_experiment(experiment: &ExperimentRecord, now: DateTime<Utc>) -> Option<ExperimentRecord> {
    let original = experiment.original_mechanics?;

    let mut updated = experiment.clone();
    updated.mechanics = original;
    updated.original_mechanics = None;
    if let Some(series) = updated.original_engineering_stress.take() {
        updated.engineering_stress = series;
    }
    updated.last_conversion_ratio = None;
    updated.last_conversion_date = None;
    updated.version += 1;
    updated
        .logbook
        .push(format!("{}: Reset data points to original values", now.to_rfc3339()));
    Some(updated)
}

/// Records rewritten by an apply or reset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub traits: Vec<TraitRecord>,
    pub experiments: Vec<ExperimentRecord>,
}

/// Experiments linked to the given traits, by experiment id or sample id.
fn linked_experiments<'a>(traits: &[&TraitRecord], experiments: &'a [ExperimentRecord]) -> Vec<&'a ExperimentRecord> {
    let experiment_ids: BTreeSet<&str> = traits.iter().filter_map(|t| t.experiment_id.as_deref()).collect();
    let sample_ids: BTreeSet<&str> = traits.iter().filter_map(|t| t.sample_id.as_deref()).collect();
    experiments
        .iter()
        .filter(|e| {
            experiment_ids.contains(e.id.as_str())
                || e.sample_id.as_deref().is_some_and(|s| sample_ids.contains(s))
        })
        .collect()
}

/// Apply a plan to the selected traits and their linked experiments.
///
/// Every record is validated and rescaled before any is returned, so either
/// the whole batch is rewritten or the error is reported and nothing is.
pub fn apply_diameter_conversion(
    selected: &[&TraitRecord],
    experiments: &[ExperimentRecord],
    plan: &ConversionPlan,
    now: DateTime<Utc>,
) -> MechResult<ConversionResult> {
    plan.validate()?;

    let traits = selected
        .iter()
        .map(|record| apply_ratio_to_trait(record, plan, now))
        .collect::<MechResult<Vec<_>>>()?;
    let experiments = linked_experiments(selected, experiments)
        .into_iter()
        .map(|experiment| rescale_experiment(experiment, plan.ratio, now))
        .collect::<MechResult<Vec<_>>>()?;

    info!(
        traits = traits.len(),
        experiments = experiments.len(),
        ratio = plan.ratio,
        "Applied diameter conversion"
    );
    Ok(ConversionResult { traits, experiments })
}

/// Reset every converted trait and linked experiment.
pub fn reset_diameter_conversion(
    traits: &[&TraitRecord],
    experiments: &[ExperimentRecord],
    now: DateTime<Utc>,
) -> ConversionResult {
    let reset_traits: Vec<TraitRecord> = traits.iter().filter_map(|t| reset_trait(t, now)).collect();
    let reset_experiments: Vec<ExperimentRecord> = linked_experiments(traits, experiments)
        .into_iter()
        .filter_map(|e| reset_experiment(e, now))
        .collect();

    if reset_traits.is_empty() && reset_experiments.is_empty() {
        debug!("Nothing to reset");
    } else {
        info!(
            traits = reset_traits.len(),
            experiments = reset_experiments.len(),
            "Reset diameter conversion"
        );
    }
    ConversionResult {
        traits: reset_traits,
        experiments: reset_experiments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn plan(ratio: f64) -> ConversionPlan {
        ConversionPlan {
            old_diameters: vec!["d1".to_string()],
            new_diameters: vec![ComparedDiameter {
                id: "d2".to_string(),
                fibre_counts: Some(FibreCountOverride::new("4", "2")),
            }],
            old_cross_section: 10.0,
            new_cross_section: 5.0,
            ratio,
        }
    }

    #[test]
    fn test_apply_and_reset_round_trip() {
        let original = TraitRecord::new("s1", "stressAtBreak", 1.3, "GPa");
        let converted = apply_ratio_to_trait(&original, &plan(2.0), now()).unwrap();
        assert_eq!(converted.measurement, Some(2.6));
        assert_eq!(converted.unit, "GPa");
        let provenance = converted.diameter_conversion.as_ref().unwrap();
        assert_eq!(provenance.ratio, 2.0);
        assert_eq!(provenance.original_value, Some(1.3));
        assert_eq!(provenance.new_diameters[0].id, "d2");
        assert_eq!(converted.logbook.len(), 1);

        let reset = reset_trait(&converted, now()).unwrap();
        assert_eq!(reset.measurement, Some(1.3));
        assert!(reset.diameter_conversion.is_none());
        assert_eq!(reset.logbook.len(), 2);
    }

    #[test]
    fn test_repeated_conversion_keeps_first_original() {
        let original = TraitRecord::new("s1", "modulus", 7.0, "GPa");
        let once = apply_ratio_to_trait(&original, &plan(2.0), now()).unwrap();
        let twice = apply_ratio_to_trait(&once, &plan(3.0), now()).unwrap();
        assert_eq!(twice.measurement, Some(42.0));
        assert_eq!(reset_trait(&twice, now()).unwrap().measurement, Some(7.0));
    }

    #[test]
    fn test_reset_without_provenance() {
        let record = TraitRecord::new("s1", "toughness", 100.0, "MJ/m³");
        assert!(reset_trait(&record, now()).is_none());
    }

    #[test]
    fn test_reset_legacy_provenance_divides() {
        let mut record = TraitRecord::new("s1", "toughness", 50.0, "MJ/m³");
        record.diameter_conversion = Some(DiameterConversion {
            date: now(),
            old_diameters: Vec::new(),
            new_diameters: Vec::new(),
            old_cross_section: 4.0,
            new_cross_section: 8.0,
            ratio: 0.5,
            original_value: None,
        });
        assert_eq!(reset_trait(&record, now()).unwrap().measurement, Some(100.0));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let record = TraitRecord::new("s1", "stressAtBreak", 1.0, "GPa");
        assert!(apply_ratio_to_trait(&record, &plan(0.0), now()).is_err());
        assert!(apply_ratio_to_trait(&record, &plan(f64::NAN), now()).is_err());
    }

    #[test]
    fn test_grouping_and_selection() {
        let records = vec![
            TraitRecord::new("a", "stressAtBreak", 1.0, "GPa").with_experiment("e1"),
            TraitRecord::new("b", "modulus", 8.0, "GPa").with_experiment("e1"),
            TraitRecord::new("c", "toughness", 90.0, "MJ/m³"),
            TraitRecord::new("d", "diameter", 5.0, "µm"),
        ];
        let groups = group_mechanical_traits(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["e1"].len(), 2);
        assert_eq!(groups[UNGROUPED][0].id, "c");

        let only_ungrouped: BTreeSet<String> = [UNGROUPED.to_string()].into_iter().collect();
        let selected = select_mechanical_traits(&records, &only_ungrouped);
        assert_eq!(selected.len(), 1);

        let changes = preview_changes(&selected, 1.5);
        assert_eq!(changes[0].experiment_id, "No Experiment");
        assert!((changes[0].new_value - 135.0).abs() < 1e-9);
        assert!((changes[0].percent_change - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_experiment_rescale_and_reset() {
        let mechanics = ExperimentMechanics {
            stress_at_break: 1.0,
            toughness: 100.0,
            offset_yield_stress: 0.3,
            modulus: 8.0,
            specimen_diameter: 4.0,
        };
        let experiment = ExperimentRecord::new("e1", mechanics, vec![0.0, 0.5, 1.0]);

        let converted = rescale_experiment(&experiment, 4.0, now()).unwrap();
        assert_eq!(converted.mechanics.stress_at_break, 4.0);
        assert_eq!(converted.mechanics.specimen_diameter, 2.0);
        assert_eq!(converted.engineering_stress, vec![0.0, 2.0, 4.0]);
        assert_eq!(converted.version, 1);

        let again = rescale_experiment(&converted, 2.0, now()).unwrap();
        assert_eq!(again.original_mechanics, Some(mechanics));

        let reset = reset_experiment(&again, now()).unwrap();
        assert_eq!(reset.mechanics, mechanics);
        assert_eq!(reset.engineering_stress, vec![0.0, 0.5, 1.0]);
        assert!(!reset.is_converted());
        assert!(reset.last_conversion_ratio.is_none());
        assert!(reset.last_conversion_date.is_none());
        assert!(reset_experiment(&reset, now()).is_none());
    }

    #[test]
    fn test_apply_batch_links_experiments() {
        let traits = vec![TraitRecord::new("a", "stressAtBreak", 1.0, "GPa").with_experiment("e1")];
        let selected: Vec<&TraitRecord> = traits.iter().collect();
        let experiments = vec![
            ExperimentRecord::new("e1", ExperimentMechanics::default(), vec![1.0]),
            ExperimentRecord::new("e2", ExperimentMechanics::default(), vec![1.0]),
        ];

        let result = apply_diameter_conversion(&selected, &experiments, &plan(2.0), now()).unwrap();
        assert_eq!(result.traits.len(), 1);
        assert_eq!(result.experiments.len(), 1);
        assert_eq!(result.experiments[0].engineering_stress, vec![2.0]);

        let converted: Vec<&TraitRecord> = result.traits.iter().collect();
        let reset = reset_diameter_conversion(&converted, &result.experiments, now());
        assert_eq!(reset.traits[0].measurement, Some(1.0));
        assert_eq!(reset.experiments[0].engineering_stress, vec![1.0]);
    }

    #[test]
    fn test_apply_batch_is_all_or_nothing() {
        let mut missing = TraitRecord::new("b", "modulus", 1.0, "GPa");
        missing.measurement = None;
        let traits = vec![TraitRecord::new("a", "stressAtBreak", 1.0, "GPa"), missing];
        let selected: Vec<&TraitRecord> = traits.iter().collect();
        let err = apply_diameter_conversion(&selected, &[], &plan(2.0), now()).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }
}
