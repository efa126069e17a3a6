//! Batch preview and apply of default-unit normalization over trait records.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::convert::{ConversionOutcome, Measurement, SkipReason};
use super::prefix::UnitTable;
use crate::records::TraitRecord;
use crate::trait_types::TraitTypeRegistry;

/// Maximum number of entries listed in a preview.
pub const PREVIEW_LIMIT: usize = 10;

/// One trait that a conversion would change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub trait_id: String,
    #[serde(rename = "type")]
    pub trait_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    pub old_value: f64,
    pub old_unit: String,
    pub new_value: f64,
    pub new_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Dry-run summary of a batch conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPreview {
    pub total_traits: usize,
    pub will_convert: usize,
    /// Everything not converted, invalid values included
    pub will_skip: usize,
    /// Subset of `will_skip` whose value could not be converted
    pub invalid: usize,
    /// First [`PREVIEW_LIMIT`] converting traits, in input order
    pub preview: Vec<PreviewEntry>,
}

/// Per-trait line of an applied conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDetail {
    pub trait_id: String,
    #[serde(rename = "type")]
    pub trait_type: String,
    pub converted: bool,
    pub old_value: Option<f64>,
    pub old_unit: String,
    pub new_value: Option<f64>,
    pub new_unit: Option<String>,
    pub reason: String,
}

/// Result of applying a batch conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitConversionReport {
    pub total_traits: usize,
    pub converted: usize,
    pub skipped: usize,
    pub details: Vec<ConversionDetail>,
    /// Records after conversion, converted ones carrying a logbook line
    pub updated: Vec<TraitRecord>,
}

/// Normalizes trait records to the default units of their trait types.
#[derive(Debug, Clone, Default)]
pub struct UnitNormalizer {
    registry: TraitTypeRegistry,
    table: UnitTable,
}

impl UnitNormalizer {
    pub fn new(registry: TraitTypeRegistry, table: UnitTable) -> Self {
        UnitNormalizer { registry, table }
    }

    pub fn registry(&self) -> &TraitTypeRegistry {
        &self.registry
    }

    pub fn table(&self) -> &UnitTable {
        &self.table
    }

    /// Decide what normalization would do to one record.
    pub fn analyze(&self, record: &TraitRecord) -> ConversionOutcome {
        let Some(measurement) = record.as_measurement() else {
            return ConversionOutcome::Skipped {
                reason: SkipReason::EmptyMeasurement,
            };
        };
        let trait_type = self.registry.get(&record.trait_type);
        self.table.convert_to_default(&measurement, trait_type)
    }

    fn analyze_all(&self, records: &[TraitRecord]) -> Vec<ConversionOutcome> {
        records.par_iter().map(|record| self.analyze(record)).collect()
    }

    /// Dry run over `records`; nothing is mutated.
    pub fn preview(&self, records: &[TraitRecord]) -> ConversionPreview {
        let outcomes = self.analyze_all(records);

        let mut will_convert = 0;
        let mut invalid = 0;
        let mut preview = Vec::new();
        for (record, outcome) in records.iter().zip(&outcomes) {
            match outcome {
                ConversionOutcome::Converted { value, unit } => {
                    will_convert += 1;
                    if preview.len() < PREVIEW_LIMIT {
                        preview.push(PreviewEntry {
                            trait_id: record.id.clone(),
                            trait_type: record.trait_type.clone(),
                            sample_id: record.sample_id.clone(),
                            old_value: record.measurement.unwrap_or_default(),
                            old_unit: record.unit.clone(),
                            new_value: *value,
                            new_unit: unit.clone(),
                            date: record.date.clone(),
                        });
                    }
                }
                ConversionOutcome::Invalid { .. } => invalid += 1,
                ConversionOutcome::Skipped { .. } => {}
            }
        }

        ConversionPreview {
            total_traits: records.len(),
            will_convert,
            will_skip: records.len() - will_convert,
            invalid,
            preview,
        }
    }

    /// Convert every record that needs it.
    ///
    /// Each converted record gets its new value and unit, a logbook line and
    /// a fresh `recentChangeDate`, all together.
    pub fn convert_traits(&self, records: &[TraitRecord], now: DateTime<Utc>) -> UnitConversionReport {
        let outcomes = self.analyze_all(records);

        let mut converted = 0;
        let mut details = Vec::with_capacity(records.len());
        let mut updated = Vec::with_capacity(records.len());

        for (record, outcome) in records.iter().zip(outcomes) {
            let mut record = record.clone();
            let reason = outcome.reason(&record.unit);
            let new = outcome.converted();

            let detail = ConversionDetail {
                trait_id: record.id.clone(),
                trait_type: record.trait_type.clone(),
                converted: new.is_some(),
                old_value: record.measurement,
                old_unit: record.unit.clone(),
                new_value: new.as_ref().map(|m| m.value),
                new_unit: new.as_ref().map(|m| m.unit.clone()),
                reason,
            };

            match (new, record.measurement) {
                (Some(Measurement { value, unit }), Some(old_value)) => {
                    let message = format!(
                        "Unit converted from {} to {} ({} → {})",
                        record.unit, unit, old_value, value
                    );
                    record.measurement = Some(value);
                    record.unit = unit;
                    record.log_change(now, message);
                    converted += 1;
                }
                _ => debug!(trait_id = %record.id, reason = %detail.reason, "Skipping unit conversion"),
            }

            details.push(detail);
            updated.push(record);
        }

        info!(total = records.len(), converted, "Applied default-unit conversion");

        UnitConversionReport {
            total_traits: records.len(),
            converted,
            skipped: records.len() - converted,
            details,
            updated,
        }
    }
}

/// Dry run using the built-in trait types and base units.
pub fn preview_conversion(records: &[TraitRecord]) -> ConversionPreview {
    UnitNormalizer::default().preview(records)
}
