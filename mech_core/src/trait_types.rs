//! # Trait Types
//!
//! The trait-type table maps a trait `type` key (e.g. `"fiber_diameter"`) to
//! its label, data type and canonical unit. Unit normalization always targets
//! the default unit recorded here.
//!
//! ```rust
//! use mech_core::trait_types::TraitTypeRegistry;
//!
//! let registry = TraitTypeRegistry::default();
//! assert_eq!(registry.default_unit("tensile_strength"), Some("MPa"));
//! assert_eq!(registry.default_unit("sex"), None);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{MechError, MechResult};

/// Trait type key for the diameter trait used by cross-section conversion.
pub const DIAMETER: &str = "diameter";
/// Trait type key of derived cross-section records.
pub const CROSS_SECTION: &str = "cross_section";

/// Kind of value a trait carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Quantitative,
    Categorical,
    Boolean,
    Ordinal,
    Multiselect,
}

/// A configured trait type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitType {
    /// Key stored on trait records
    #[serde(rename = "type", alias = "value")]
    pub key: String,
    #[serde(default)]
    pub label: String,
    /// Canonical unit; `None` for unitless or non-quantitative traits
    #[serde(default, alias = "unit", skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TraitType {
    /// A quantitative trait type with the given canonical unit.
    pub fn quantitative(key: impl Into<String>, default_unit: impl Into<String>) -> Self {
        let key = key.into();
        TraitType {
            label: key.clone(),
            key,
            default_unit: Some(default_unit.into()),
            data_type: DataType::Quantitative,
            description: String::new(),
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    /// A trait type that carries no unit.
    pub fn unitless(key: impl Into<String>, data_type: DataType) -> Self {
        let key = key.into();
        TraitType {
            label: key.clone(),
            key,
            default_unit: None,
            data_type,
            description: String::new(),
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    fn described(mut self, label: &str, description: &str) -> Self {
        self.label = label.to_string();
        self.description = description.to_string();
        self
    }

    fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Built-in trait-type table.
pub static DEFAULT_TRAIT_TYPES: Lazy<Vec<TraitType>> = Lazy::new(|| {
    use DataType::*;
    vec![
        TraitType::quantitative("mass", "g").described("Mass", "Mass of the sample measured using a microbalance"),
        TraitType::quantitative("length", "mm").described("Length", "Length along the longest symmetry axis"),
        TraitType::quantitative("width", "mm").described("Width", "Width perpendicular to the longest symmetry axis"),
        TraitType::quantitative("dna_concentration", "ng/µl").described("DNA Concentration", "DNA concentration of the sample"),
        TraitType::quantitative("resting_metabolic_rate", "W")
            .described("Resting Metabolic Rate", "Metabolic rate measured by respirometry at rest"),
        TraitType::quantitative("fiber_diameter", "µm").described("Fiber Diameter", "Diameter of individual fibers"),
        TraitType::quantitative("tensile_strength", "MPa")
            .described("Tensile Strength", "Maximum stress material can withstand while being stretched"),
        TraitType::quantitative("bone_density", "g/cm³").described("Bone Density", "Density of bone tissue"),
        TraitType::quantitative("cortical_thickness", "mm").described("Cortical Thickness", "Thickness of cortical bone layer"),
        TraitType::quantitative("leaf_area", "cm²").described("Leaf Area", "Total surface area of leaf"),
        TraitType::quantitative("chlorophyll_content", "mg/g")
            .described("Chlorophyll Content", "Chlorophyll concentration in leaf tissue"),
        TraitType::quantitative("wood_density", "g/cm³").described("Wood Density", "Density of wood tissue"),
        TraitType::quantitative("ring_width", "mm").described("Ring Width", "Width of annual growth rings"),
        TraitType::quantitative("stomatal_density", "stomata/mm²").described("Stomatal Density", "Number of stomata per unit area"),
        TraitType::quantitative("bark_thickness", "mm").described("Bark Thickness", "Thickness of bark layer"),
        // Fibre mechanics
        TraitType::quantitative(DIAMETER, "µm").described("Diameter", "Diameter of a fibre or fibre bundle"),
        TraitType::quantitative(CROSS_SECTION, "µm²").described("Cross Section", "Cross-sectional area derived from diameter"),
        TraitType::quantitative("stressAtBreak", "GPa").described("Stress at Break", "Engineering stress at failure"),
        TraitType::unitless("strainAtBreak", Quantitative).described("Strain at Break", "Engineering strain at failure"),
        TraitType::quantitative("toughness", "MJ/m³").described("Toughness", "Energy absorbed per unit volume before failure"),
        TraitType::quantitative("modulus", "GPa").described("Modulus", "Initial elastic modulus"),
        // Categorical
        TraitType::unitless("sex", Categorical)
            .described("Sex", "Biological sex of the specimen")
            .with_options(&["male", "female", "hermaphrodite", "unknown"]),
        TraitType::unitless("life_stage", Categorical)
            .described("Life Stage", "Developmental stage of the specimen")
            .with_options(&["egg", "embryo", "larva", "pupa", "nymph", "juvenile", "subadult", "adult", "senescent"]),
        TraitType::unitless("preservation_method", Categorical)
            .described("Preservation Method", "How the sample was preserved")
            .with_options(&["frozen", "ethanol", "formalin", "dried", "fresh", "RNAlater", "DMSO"]),
        // Boolean
        TraitType::unitless("has_wings", Boolean).described("Has Wings", "Presence of wings"),
        TraitType::unitless("gravid", Boolean).described("Gravid", "Whether specimen is carrying eggs/offspring"),
        // Ordinal
        TraitType::unitless("condition_score", Ordinal)
            .described("Condition Score", "Overall physical condition (1=poor to 5=excellent)")
            .with_range(1.0, 5.0),
        TraitType::unitless("damage_level", Ordinal)
            .described("Damage Level", "Level of specimen damage (1=none to 5=severe)")
            .with_range(1.0, 5.0),
        // Multiselect
        TraitType::unitless("body_markings", Multiselect)
            .described("Body Markings", "Visible markings or patterns on the body")
            .with_options(&["stripes", "spots", "bands", "patches", "reticulation", "mottling", "solid", "gradient"]),
    ]
});

/// Lookup table from trait type key to [`TraitType`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraitTypeRegistry {
    types: HashMap<String, TraitType>,
}

impl Default for TraitTypeRegistry {
    fn default() -> Self {
        TraitTypeRegistry::new(DEFAULT_TRAIT_TYPES.iter().cloned())
    }
}

impl TraitTypeRegistry {
    /// Build a registry; later entries replace earlier ones with the same key.
    pub fn new(types: impl IntoIterator<Item = TraitType>) -> Self {
        TraitTypeRegistry {
            types: types.into_iter().map(|t| (t.key.clone(), t)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&TraitType> {
        self.types.get(key)
    }

    /// Like [`get`](Self::get), but an unknown key is an error.
    pub fn require(&self, key: &str) -> MechResult<&TraitType> {
        self.get(key).ok_or_else(|| MechError::unknown_trait_type(key))
    }

    pub fn default_unit(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|t| t.default_unit.as_deref())
    }

    /// Add or replace a trait type.
    pub fn insert(&mut self, trait_type: TraitType) {
        self.types.insert(trait_type.key.clone(), trait_type);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All trait types, sorted by key.
    pub fn types(&self) -> Vec<&TraitType> {
        let mut types: Vec<&TraitType> = self.types.values().collect();
        types.sort_by(|a, b| a.key.cmp(&b.key));
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = TraitTypeRegistry::default();
        assert_eq!(registry.default_unit(DIAMETER), Some("µm"));
        assert_eq!(registry.default_unit("stressAtBreak"), Some("GPa"));
        assert_eq!(registry.get("sex").map(|t| t.data_type), Some(DataType::Categorical));
        assert!(registry.get("strainAtBreak").unwrap().default_unit.is_none());
    }

    #[test]
    fn test_default_units_use_one_micro_sign() {
        let registry = TraitTypeRegistry::default();
        assert_eq!(registry.default_unit("fiber_diameter"), registry.default_unit(DIAMETER));
        for trait_type in registry.types() {
            let unit = trait_type.default_unit.as_deref().unwrap_or("");
            assert!(!unit.contains('\u{3bc}'), "{} uses the Greek mu", trait_type.key);
        }
    }

    #[test]
    fn test_require_unknown() {
        let registry = TraitTypeRegistry::default();
        let err = registry.require("wingspan").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TRAIT_TYPE");
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = TraitTypeRegistry::default();
        let before = registry.len();
        registry.insert(TraitType::quantitative("mass", "mg"));
        assert_eq!(registry.len(), before);
        assert_eq!(registry.default_unit("mass"), Some("mg"));
    }

    #[test]
    fn test_deserialize_table_shape() {
        let json = r#"{"value": "fiber_diameter", "label": "Fiber Diameter", "unit": "μm", "dataType": "quantitative"}"#;
        let parsed: TraitType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.key, "fiber_diameter");
        assert_eq!(parsed.default_unit.as_deref(), Some("μm"));

        let ordinal: TraitType =
            serde_json::from_str(r#"{"type": "damage_level", "dataType": "ordinal", "min": 1, "max": 5}"#).unwrap();
        assert_eq!(ordinal.data_type, DataType::Ordinal);
        assert_eq!(ordinal.max, Some(5.0));
    }
}
