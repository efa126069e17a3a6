//! # Cross-Section / Diameter Converter
//!
//! Fibre cross-sections from diameter traits, baseline vs comparison
//! totals, and the ratio used to rescale stress-like traits when the assumed
//! cross-section changes.
//!
//! ## Example
//!
//! ```rust
//! use mech_core::cross_section::{diameter_to_area, equivalent_diameter, scale_ratio};
//!
//! let area = diameter_to_area(5.0);
//! assert!((area - 19.635).abs() < 1e-3);
//! assert!((equivalent_diameter(area) - 5.0).abs() < 1e-12);
//! assert_eq!(scale_ratio(area, 0.0), 1.0);
//! ```

mod aggregate;
mod area;
mod conversion;
mod workflow;

pub use aggregate::{
    aggregate_baseline, aggregate_comparison, compare_cross_sections, compute_scale_ratio, scale_ratio, AreaTotals,
    ComparisonUnits, CrossSectionComparison, CrossSectionEntry, CrossSectionSelection, FibreCountOverride,
    SelectionSummary, ValueOrRange,
};
pub use area::{
    cross_section_for_diameter_trait, derive_cross_section_trait, diameter_to_area, equivalent_diameter,
    parse_fibre_count, total_area, AreaValue, CrossSection, FibreCount,
};
pub use conversion::{
    apply_diameter_conversion, apply_ratio, apply_ratio_to_trait, group_key, group_mechanical_traits, is_mechanical,
    preview_changes, rescale_experiment, reset_diameter_conversion, reset_experiment, reset_trait,
    select_mechanical_traits, ComparedDiameter, ConversionChange, ConversionPlan, ConversionResult,
    DiameterConversion, MECHANICAL_TRAIT_TYPES, UNGROUPED,
};
pub use workflow::{ConversionWorkflow, PendingConversion, WorkflowState};
