//! # mech_core - Fibre Mechanics Engine
//!
//! `mech_core` holds the numerical side of a fibre-mechanics data manager:
//! normalizing trait measurements to their default units, rescaling
//! mechanical traits when the assumed fibre cross-section changes, and
//! simulating the load-strain response of multi-fibre bundles. All inputs
//! and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Pure operations**: records go in, updated copies and reports come out;
//!   persistence is the caller's business
//! - **JSON-First**: every public type implements Serialize/Deserialize
//! - **Rich Errors**: structured error types with stable codes
//! - **Reproducible**: the stochastic bundle model takes any `Rng`, and a
//!   seeded entry point gives identical runs
//!
//! ## Quick Start
//!
//! ```rust
//! use mech_core::units::convert_measurement;
//! use mech_core::cross_section::diameter_to_area;
//!
//! assert_eq!(convert_measurement(1.0, "GPa", "MPa"), Some(1000.0));
//! assert!((diameter_to_area(5.0) - 19.635).abs() < 1e-3);
//! ```
//!
//! ## Modules
//!
//! - [`units`] - SI-prefix parsing, conversion and batch normalization
//! - [`cross_section`] - Cross-section comparison and diameter conversion
//! - [`bundle`] - Linear and non-linear fibre-bundle simulation
//! - [`trait_types`] - Trait-type table with default units
//! - [`records`] - Trait and experiment records
//! - [`settings`] - Engine configuration
//! - [`errors`] - Structured error types
//! - [`file_io`] - JSON files with atomic saves

pub mod bundle;
pub mod cross_section;
pub mod errors;
pub mod file_io;
pub mod records;
pub mod settings;
pub mod trait_types;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use errors::{MechError, MechResult};
pub use file_io::{load_json, load_settings, save_json, save_settings};
pub use records::{ExperimentRecord, TraitRecord};
pub use settings::Settings;
pub use trait_types::{TraitType, TraitTypeRegistry};
