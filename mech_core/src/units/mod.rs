//! # Unit Normalizer
//!
//! SI-prefix parsing, prefix-only conversion between units, and batch
//! normalization of trait records to their trait type's default unit.
//!
//! ## Example
//!
//! ```rust
//! use mech_core::units::convert_measurement;
//!
//! assert_eq!(convert_measurement(1.0, "GPa", "MPa"), Some(1000.0));
//! assert_eq!(convert_measurement(1.0, "GPa", "mm"), None);
//! ```

mod batch;
mod convert;
mod prefix;

pub use batch::{
    preview_conversion, ConversionDetail, ConversionPreview, PreviewEntry, UnitConversionReport, UnitNormalizer,
    PREVIEW_LIMIT,
};
pub use convert::{
    are_units_compatible, convert_measurement, convert_to_default_unit, ConversionOutcome, Measurement, SkipReason,
};
pub use prefix::{
    default_table, parse_unit, prefix_by_symbol, ParsedUnit, SiPrefix, UnitExpr, UnitTable, DEFAULT_BASE_UNITS,
    SI_PREFIXES,
};
