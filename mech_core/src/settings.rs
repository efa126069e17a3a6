//! # Settings
//!
//! Configuration shared by the engine: the trait-type table, the base units
//! prefixes may attach to, and defaults for the bundle models. Settings
//! files are JSON carrying a schema `version` (see [`crate::file_io`]).
//!
//! ## Example
//!
//! ```rust
//! use mech_core::settings::Settings;
//!
//! let settings = Settings::default();
//! assert_eq!(settings.bundle.options.strain_points, 1000);
//! assert_eq!(settings.bundle.weibull.weibull_shape, 75.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::bundle::{BundleOptions, HumidityParams, HyperelasticParams, WeibullParams};
use crate::errors::MechResult;
use crate::trait_types::{TraitType, TraitTypeRegistry, DEFAULT_TRAIT_TYPES};
use crate::units::{UnitNormalizer, UnitTable, DEFAULT_BASE_UNITS};

/// Current schema version for settings files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Schema version the file was written with
    pub version: String,

    #[serde(default = "default_trait_types")]
    pub trait_types: Vec<TraitType>,

    #[serde(default = "default_base_units")]
    pub base_units: Vec<String>,

    #[serde(default)]
    pub bundle: BundleDefaults,
}

fn default_trait_types() -> Vec<TraitType> {
    DEFAULT_TRAIT_TYPES.clone()
}

fn default_base_units() -> Vec<String> {
    DEFAULT_BASE_UNITS.iter().map(|u| u.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: SCHEMA_VERSION.to_string(),
            trait_types: default_trait_types(),
            base_units: default_base_units(),
            bundle: BundleDefaults::default(),
        }
    }
}

impl Settings {
    pub fn registry(&self) -> TraitTypeRegistry {
        TraitTypeRegistry::new(self.trait_types.iter().cloned())
    }

    pub fn unit_table(&self) -> UnitTable {
        UnitTable::with_base_units(self.base_units.iter().cloned())
    }

    pub fn normalizer(&self) -> UnitNormalizer {
        UnitNormalizer::new(self.registry(), self.unit_table())
    }

    /// Check every bundle default for consistency.
    pub fn validate(&self) -> MechResult<()> {
        self.bundle.hyperelastic.validate()?;
        self.bundle.humidity.validate()?;
        self.bundle.weibull.validate()?;
        self.bundle.options.validate()
    }
}

/// Defaults for the bundle simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDefaults {
    #[serde(default)]
    pub hyperelastic: HyperelasticParams,
    #[serde(default)]
    pub humidity: HumidityParams,
    #[serde(default)]
    pub weibull: WeibullParams,
    #[serde(flatten)]
    pub options: BundleOptions,
}
