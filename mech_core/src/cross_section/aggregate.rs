//! Baseline vs comparison cross-section totals and the resulting scale ratio.
//!
//! The baseline column sums the selected diameter traits as recorded. The
//! comparison column may additionally rescale each trait by a fibre-count
//! override (`new / original`), previewing a hypothetical recount. The two
//! are kept as separate operations so the override can never leak into the
//! baseline.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::area::{cross_section_for_diameter_trait, equivalent_diameter, leading_integer, CrossSection};
use crate::records::TraitRecord;

/// One diameter trait's contribution to a cross-section total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionEntry {
    pub trait_id: String,
    pub cross_section: CrossSection,
    pub included: bool,
}

impl CrossSectionEntry {
    /// Entry for a diameter trait; `None` for other traits or empty measurements.
    pub fn from_record(record: &TraitRecord, included: bool) -> Option<Self> {
        cross_section_for_diameter_trait(record).map(|cross_section| CrossSectionEntry {
            trait_id: record.id.clone(),
            cross_section,
            included,
        })
    }
}

/// Edited fibre count for one diameter trait in the comparison column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FibreCountOverride {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub new: String,
}

impl FibreCountOverride {
    pub fn new(original: impl Into<String>, new: impl Into<String>) -> Self {
        FibreCountOverride {
            original: original.into(),
            new: new.into(),
        }
    }

    /// `new / original` using the leading integer of each, or 1 when either
    /// side is missing, non-numeric or the original is zero.
    pub fn ratio(&self) -> f64 {
        match (leading_integer(&self.original), leading_integer(&self.new)) {
            (Some(original), Some(new)) if original != 0 => new as f64 / original as f64,
            _ => 1.0,
        }
    }
}

/// Accumulated area of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTotals {
    pub single: f64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub has_range_values: bool,
}

impl AreaTotals {
    /// Value used for ratios: `avg` when any entry was ranged, else `single`.
    pub fn representative(&self) -> f64 {
        if self.has_range_values {
            self.avg
        } else {
            self.single
        }
    }

    fn add(&mut self, cross_section: &CrossSection, factor: f64) {
        let Some(area) = cross_section.area else {
            return;
        };
        if let Some(single) = area.single {
            let adjusted = single * factor;
            self.single += adjusted;
            self.min += adjusted;
            self.avg += adjusted;
            self.max += adjusted;
        } else if let (Some(min), Some(avg), Some(max)) = (area.min, area.avg, area.max) {
            self.has_range_values = true;
            self.min += min * factor;
            self.avg += avg * factor;
            self.max += max * factor;
        }
    }
}

fn usable(entry: &CrossSectionEntry) -> bool {
    entry.included && entry.cross_section.error.is_none()
}

/// Sum the included entries as recorded.
pub fn aggregate_baseline(entries: &[CrossSectionEntry]) -> AreaTotals {
    let mut totals = AreaTotals::default();
    for entry in entries.iter().filter(|e| usable(e)) {
        totals.add(&entry.cross_section, 1.0);
    }
    totals
}

/// Sum the included entries, each scaled by its fibre-count override.
pub fn aggregate_comparison(entries: &[CrossSectionEntry], overrides: &HashMap<String, FibreCountOverride>) -> AreaTotals {
    let mut totals = AreaTotals::default();
    for entry in entries.iter().filter(|e| usable(e)) {
        let factor = overrides.get(&entry.trait_id).map_or(1.0, FibreCountOverride::ratio);
        totals.add(&entry.cross_section, factor);
    }
    totals
}

/// `selected / compared`, or 1 when the compared value is zero.
pub fn scale_ratio(selected: f64, compared: f64) -> f64 {
    if compared == 0.0 {
        warn!(selected, "Comparison cross-section is zero, using ratio 1");
        1.0
    } else {
        selected / compared
    }
}

/// Ratio between two aggregated selections.
pub fn compute_scale_ratio(selected: &AreaTotals, compared: &AreaTotals) -> f64 {
    scale_ratio(selected.representative(), compared.representative())
}

/// A single value or min/avg/max bounds, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOrRange {
    Single(f64),
    Range { min: f64, avg: f64, max: f64 },
}

/// Totals and equivalent diameter of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub area: ValueOrRange,
    pub diameter: ValueOrRange,
    pub has_range_values: bool,
    #[serde(skip)]
    pub totals: AreaTotals,
}

impl From<AreaTotals> for SelectionSummary {
    fn from(totals: AreaTotals) -> Self {
        let (area, diameter) = if totals.has_range_values {
            (
                ValueOrRange::Range {
                    min: totals.min,
                    avg: totals.avg,
                    max: totals.max,
                },
                ValueOrRange::Range {
                    min: equivalent_diameter(totals.min),
                    avg: equivalent_diameter(totals.avg),
                    max: equivalent_diameter(totals.max),
                },
            )
        } else {
            (
                ValueOrRange::Single(totals.single),
                ValueOrRange::Single(equivalent_diameter(totals.single)),
            )
        };
        SelectionSummary {
            area,
            diameter,
            has_range_values: totals.has_range_values,
            totals,
        }
    }
}

/// Display units of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonUnits {
    pub area: String,
    pub diameter: String,
}

/// Which diameter traits feed each column, plus comparison overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionSelection {
    /// Trait ids summed into the baseline column
    #[serde(default)]
    pub included: BTreeSet<String>,
    /// Trait ids summed into the comparison column
    #[serde(default)]
    pub compared: BTreeSet<String>,
    #[serde(default)]
    pub fibre_counts: HashMap<String, FibreCountOverride>,
}

impl CrossSectionSelection {
    /// Every diameter trait in the baseline, none in the comparison.
    pub fn initial(records: &[TraitRecord]) -> Self {
        let diameters = records.iter().filter(|r| r.trait_type == crate::trait_types::DIAMETER);
        let mut selection = CrossSectionSelection::default();
        for record in diameters {
            selection.included.insert(record.id.clone());
            let nfibres = record.nfibres.clone().unwrap_or_default();
            selection
                .fibre_counts
                .insert(record.id.clone(), FibreCountOverride::new(nfibres.clone(), nfibres));
        }
        selection
    }

    pub fn has_comparison(&self) -> bool {
        !self.compared.is_empty()
    }
}

/// Baseline and comparison columns with the ratio between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionComparison {
    pub included: SelectionSummary,
    pub compared: SelectionSummary,
    pub units: ComparisonUnits,
    pub ratio: f64,
}

impl CrossSectionComparison {
    /// Percent change a ratio applies to rescaled values.
    pub fn percent_change(&self) -> f64 {
        (self.ratio - 1.0) * 100.0
    }
}

/// Compare two selections of the diameter traits among `records`.
///
/// Returns `None` when there are no usable diameter traits at all.
pub fn compare_cross_sections(records: &[TraitRecord], selection: &CrossSectionSelection) -> Option<CrossSectionComparison> {
    let baseline: Vec<CrossSectionEntry> = records
        .iter()
        .filter_map(|r| CrossSectionEntry::from_record(r, selection.included.contains(&r.id)))
        .collect();
    if baseline.is_empty() {
        return None;
    }
    let comparison: Vec<CrossSectionEntry> = baseline
        .iter()
        .map(|entry| CrossSectionEntry {
            included: selection.compared.contains(&entry.trait_id),
            ..entry.clone()
        })
        .collect();

    let included = aggregate_baseline(&baseline);
    let compared = aggregate_comparison(&comparison, &selection.fibre_counts);
    let ratio = compute_scale_ratio(&included, &compared);

    let area_unit = baseline[0].cross_section.unit.clone();
    let diameter_unit = area_unit.replace('²', "");

    Some(CrossSectionComparison {
        included: included.into(),
        compared: compared.into(),
        units: ComparisonUnits {
            area: area_unit,
            diameter: diameter_unit,
        },
        ratio,
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::trait_types::DIAMETER;

    fn diameters() -> Vec<TraitRecord> {
        vec![
            TraitRecord::new("a", DIAMETER, 2.0, "µm").with_nfibres("4"),
            TraitRecord::new("b", DIAMETER, 4.0, "µm").with_nfibres("1"),
            TraitRecord::new("c", DIAMETER, 2.0, "µm").with_nfibres("2-4"),
            TraitRecord::new("bad", DIAMETER, 2.0, "µm").with_nfibres("many"),
        ]
    }

    fn entries(included: &[&str]) -> Vec<CrossSectionEntry> {
        diameters()
            .iter()
            .filter_map(|r| CrossSectionEntry::from_record(r, included.contains(&r.id.as_str())))
            .collect()
    }

    #[test]
    fn test_ratio_degeneracy() {
        assert_eq!(scale_ratio(42.0, 0.0), 1.0);
        assert_eq!(scale_ratio(0.0, 0.0), 1.0);
        assert_eq!(scale_ratio(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_baseline_single_values() {
        let totals = aggregate_baseline(&entries(&["a", "b"]));
        assert!(!totals.has_range_values);
        assert!((totals.single - 8.0 * PI).abs() < 1e-9);
        assert_eq!(totals.single, totals.min);
        assert_eq!(totals.single, totals.max);
    }

    #[test]
    fn test_range_entries_use_avg() {
        let totals = aggregate_baseline(&entries(&["b", "c"]));
        assert!(totals.has_range_values);
        assert!((totals.min - 6.0 * PI).abs() < 1e-9);
        assert!((totals.avg - 7.0 * PI).abs() < 1e-9);
        assert!((totals.max - 8.0 * PI).abs() < 1e-9);
        assert!((totals.representative() - 7.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_errored_and_excluded_entries_skipped() {
        let totals = aggregate_baseline(&entries(&["bad"]));
        assert_eq!(totals, AreaTotals::default());
    }

    #[test]
    fn test_overrides_only_affect_comparison() {
        let mut overrides = HashMap::new();
        overrides.insert("a".to_string(), FibreCountOverride::new("4", "2"));

        let baseline = aggregate_baseline(&entries(&["a"]));
        let comparison = aggregate_comparison(&entries(&["a"]), &overrides);
        assert!((baseline.single - 4.0 * PI).abs() < 1e-9);
        assert!((comparison.single - 2.0 * PI).abs() < 1e-9);
        assert!((compute_scale_ratio(&baseline, &comparison) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_override_ratio_fallbacks() {
        assert_eq!(FibreCountOverride::new("", "3").ratio(), 1.0);
        assert_eq!(FibreCountOverride::new("bundle", "3").ratio(), 1.0);
        assert_eq!(FibreCountOverride::new("0", "3").ratio(), 1.0);
        assert_eq!(FibreCountOverride::new("2-4", "4").ratio(), 2.0);
    }

    #[test]
    fn test_compare_cross_sections() {
        let records = diameters();
        let mut selection = CrossSectionSelection::initial(&records);
        selection.included = ["a".to_string()].into_iter().collect();
        selection.compared = ["b".to_string()].into_iter().collect();

        let comparison = compare_cross_sections(&records, &selection).unwrap();
        assert_eq!(comparison.units.area, "µm²");
        assert_eq!(comparison.units.diameter, "µm");
        assert!((comparison.ratio - 1.0).abs() < 1e-12);
        match comparison.included.diameter {
            ValueOrRange::Single(d) => assert!((d - 4.0).abs() < 1e-9),
            other => panic!("expected a single diameter, got {other:?}"),
        }
        assert!(comparison.percent_change().abs() < 1e-9);
    }

    #[test]
    fn test_compare_without_diameters() {
        let records = vec![TraitRecord::new("s", "stressAtBreak", 1.0, "GPa")];
        assert!(compare_cross_sections(&records, &CrossSectionSelection::default()).is_none());
    }
}
