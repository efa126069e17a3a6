//! SI prefix table and unit-string parsing.
//!
//! A unit string is split into an optional SI prefix and a base unit. The
//! prefix is only accepted when what remains is a known base unit, so `Pa`,
//! `mol` and `cd` are never read as peta-`a`, milli-`ol` or centi-`d`.
//! Single-character stems (`m`, `g`) never carry a prefix.
//!
//! ```rust
//! use mech_core::units::parse_unit;
//!
//! let gpa = parse_unit("GPa");
//! assert_eq!(gpa.prefix, "G");
//! assert_eq!(gpa.power, 9);
//! assert_eq!(gpa.base_unit, "Pa");
//!
//! let area = parse_unit("mm²");
//! assert_eq!(area.base_unit, "m²");
//! assert_eq!(area.scale_power(), -6);
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One entry of the SI prefix table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiPrefix {
    pub label: &'static str,
    pub symbol: &'static str,
    pub power: i32,
}

/// The SI prefixes, Yotta (10²⁴) through Yocto (10⁻²⁴).
pub const SI_PREFIXES: [SiPrefix; 20] = [
    SiPrefix { label: "Yotta", symbol: "Y", power: 24 },
    SiPrefix { label: "Zetta", symbol: "Z", power: 21 },
    SiPrefix { label: "Exa", symbol: "E", power: 18 },
    SiPrefix { label: "Peta", symbol: "P", power: 15 },
    SiPrefix { label: "Tera", symbol: "T", power: 12 },
    SiPrefix { label: "Giga", symbol: "G", power: 9 },
    SiPrefix { label: "Mega", symbol: "M", power: 6 },
    SiPrefix { label: "Kilo", symbol: "k", power: 3 },
    SiPrefix { label: "Hecto", symbol: "h", power: 2 },
    SiPrefix { label: "Deka", symbol: "da", power: 1 },
    SiPrefix { label: "Deci", symbol: "d", power: -1 },
    SiPrefix { label: "Centi", symbol: "c", power: -2 },
    SiPrefix { label: "Milli", symbol: "m", power: -3 },
    SiPrefix { label: "Micro", symbol: "µ", power: -6 },
    SiPrefix { label: "Nano", symbol: "n", power: -9 },
    SiPrefix { label: "Pico", symbol: "p", power: -12 },
    SiPrefix { label: "Femto", symbol: "f", power: -15 },
    SiPrefix { label: "Atto", symbol: "a", power: -18 },
    SiPrefix { label: "Zepto", symbol: "z", power: -21 },
    SiPrefix { label: "Yocto", symbol: "y", power: -24 },
];

/// Alternative spellings of the micro prefix: Greek mu (U+03BC) and ASCII `u`.
const MICRO_ALIASES: [&str; 2] = ["μ", "u"];

/// Base units a prefix may attach to.
pub const DEFAULT_BASE_UNITS: [&str; 24] = [
    "m", "g", "s", "A", "K", "mol", "cd", "Pa", "N", "J", "W", "Hz", "V", "C", "Ω", "F", "T",
    "Wb", "H", "S", "L", "l", "eV", "bar",
];

/// Prefix symbols (aliases included) ordered longest first so `da` wins over `d`.
static PREFIX_CANDIDATES: Lazy<Vec<(&'static str, i32)>> = Lazy::new(|| {
    let mut candidates: Vec<(&'static str, i32)> =
        SI_PREFIXES.iter().map(|p| (p.symbol, p.power)).collect();
    candidates.extend(MICRO_ALIASES.iter().map(|alias| (*alias, -6)));
    candidates.sort_by_key(|(symbol, _)| std::cmp::Reverse(symbol.chars().count()));
    candidates
});

static DEFAULT_TABLE: Lazy<UnitTable> = Lazy::new(UnitTable::default);

/// Look up an SI prefix by symbol (micro aliases accepted).
pub fn prefix_by_symbol(symbol: &str) -> Option<SiPrefix> {
    let canonical = if MICRO_ALIASES.contains(&symbol) { "µ" } else { symbol };
    SI_PREFIXES.iter().copied().find(|p| p.symbol == canonical)
}

/// A unit string split into prefix, power of ten and base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUnit {
    /// Prefix symbol as written, empty when there is none
    pub prefix: String,
    /// Power of ten of the prefix (0 when there is none)
    pub power: i32,
    /// Base unit including any dimension suffix (e.g. "m²")
    pub base_unit: String,
    /// Dimension exponent taken from a `²`, `³` or `^n` suffix
    pub exponent: i32,
}

impl ParsedUnit {
    /// Power of ten contributed by the prefix once the dimension is applied.
    ///
    /// `mm` → -3, `mm²` → -6, `cm³` → -6.
    pub fn scale_power(&self) -> i32 {
        self.power * self.exponent
    }
}

/// A unit that may be a quotient such as `ng/µl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitExpr {
    pub numerator: ParsedUnit,
    pub denominator: Option<ParsedUnit>,
}

impl UnitExpr {
    /// Net power of ten of the expression.
    pub fn scale_power(&self) -> i32 {
        let den = self.denominator.as_ref().map_or(0, ParsedUnit::scale_power);
        self.numerator.scale_power() - den
    }

    /// True when both sides share base units, regardless of prefixes.
    pub fn same_base(&self, other: &UnitExpr) -> bool {
        let den_base = |e: &UnitExpr| e.denominator.as_ref().map(|d| d.base_unit.clone());
        self.numerator.base_unit == other.numerator.base_unit && den_base(self) == den_base(other)
    }
}

/// The set of base units prefixes are allowed to attach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    base_units: Vec<String>,
}

impl Default for UnitTable {
    fn default() -> Self {
        UnitTable::with_base_units(DEFAULT_BASE_UNITS.iter().copied())
    }
}

impl UnitTable {
    /// Build a table from a custom list of base units.
    pub fn with_base_units<I, S>(base_units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UnitTable {
            base_units: base_units.into_iter().map(Into::into).collect(),
        }
    }

    /// Base units known to this table.
    pub fn base_units(&self) -> &[String] {
        &self.base_units
    }

    fn is_base_unit(&self, stem: &str) -> bool {
        self.base_units.iter().any(|u| u == stem)
    }

    /// Split a single (non-quotient) unit into prefix and base unit.
    ///
    /// Unknown base units pass through with power 0.
    pub fn parse(&self, unit: &str) -> ParsedUnit {
        let unit = unit.trim();
        let (stem, exponent) = split_exponent(unit);
        let suffix = &unit[stem.len()..];

        if stem.chars().count() > 1 {
            for (symbol, power) in PREFIX_CANDIDATES.iter() {
                if let Some(rest) = stem.strip_prefix(symbol) {
                    if !rest.is_empty() && self.is_base_unit(rest) {
                        return ParsedUnit {
                            prefix: (*symbol).to_string(),
                            power: *power,
                            base_unit: format!("{rest}{suffix}"),
                            exponent,
                        };
                    }
                }
            }
        }

        ParsedUnit {
            prefix: String::new(),
            power: 0,
            base_unit: unit.to_string(),
            exponent,
        }
    }

    /// Parse a unit that may contain one `/`.
    pub fn parse_expr(&self, unit: &str) -> UnitExpr {
        match unit.split_once('/') {
            Some((num, den)) => UnitExpr {
                numerator: self.parse(num),
                denominator: Some(self.parse(den)),
            },
            None => UnitExpr {
                numerator: self.parse(unit),
                denominator: None,
            },
        }
    }
}

/// Parse a unit string against the default base-unit table.
pub fn parse_unit(unit: &str) -> ParsedUnit {
    DEFAULT_TABLE.parse(unit)
}

/// Default table shared by the free-function API.
pub fn default_table() -> &'static UnitTable {
    &DEFAULT_TABLE
}

/// Strip a trailing dimension exponent, returning the stem and exponent.
fn split_exponent(unit: &str) -> (&str, i32) {
    if let Some(stem) = unit.strip_suffix('²') {
        return (stem, 2);
    }
    if let Some(stem) = unit.strip_suffix('³') {
        return (stem, 3);
    }
    if let Some((stem, exp)) = unit.rsplit_once('^') {
        if let Ok(exp) = exp.parse::<i32>() {
            if exp != 0 {
                return (stem, exp);
            }
        }
    }
    (unit, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_prefixes() {
        let mm = parse_unit("mm");
        assert_eq!((mm.prefix.as_str(), mm.power, mm.base_unit.as_str()), ("m", -3, "m"));

        let kg = parse_unit("kg");
        assert_eq!((kg.power, kg.base_unit.as_str()), (3, "g"));

        let gpa = parse_unit("GPa");
        assert_eq!((gpa.power, gpa.base_unit.as_str()), (9, "Pa"));
    }

    #[test]
    fn test_micro_spellings() {
        for unit in ["µm", "μm", "um"] {
            let parsed = parse_unit(unit);
            assert_eq!(parsed.power, -6, "{unit}");
            assert_eq!(parsed.base_unit, "m", "{unit}");
        }
    }

    #[test]
    fn test_deka_before_deci() {
        let dam = parse_unit("dam");
        assert_eq!((dam.prefix.as_str(), dam.power), ("da", 1));

        let dm = parse_unit("dm");
        assert_eq!((dm.prefix.as_str(), dm.power), ("d", -1));
    }

    #[test]
    fn test_no_prefix_when_remainder_unknown() {
        for unit in ["Pa", "mol", "cd", "min", "m", "g"] {
            let parsed = parse_unit(unit);
            assert_eq!(parsed.power, 0, "{unit}");
            assert_eq!(parsed.base_unit, unit);
        }
    }

    #[test]
    fn test_unknown_units_pass_through() {
        let parsed = parse_unit("stomata");
        assert_eq!(parsed.prefix, "");
        assert_eq!(parsed.power, 0);
        assert_eq!(parsed.base_unit, "stomata");
    }

    #[test]
    fn test_dimension_exponents() {
        let area = parse_unit("µm²");
        assert_eq!(area.base_unit, "m²");
        assert_eq!(area.exponent, 2);
        assert_eq!(area.scale_power(), -12);

        let volume = parse_unit("cm³");
        assert_eq!(volume.scale_power(), -6);

        let caret = parse_unit("mm^2");
        assert_eq!(caret.base_unit, "m^2");
        assert_eq!(caret.scale_power(), -6);

        // Exponent is stripped before the single-character rule applies
        let m3 = parse_unit("m³");
        assert_eq!(m3.power, 0);
    }

    #[test]
    fn test_quotient_units() {
        let table = UnitTable::default();
        let conc = table.parse_expr("ng/µl");
        assert_eq!(conc.numerator.power, -9);
        assert_eq!(conc.denominator.as_ref().unwrap().power, -6);
        assert_eq!(conc.scale_power(), -3);

        let density = table.parse_expr("g/cm³");
        assert_eq!(density.scale_power(), 6);
        assert!(density.same_base(&table.parse_expr("kg/m³")));
        assert!(!density.same_base(&table.parse_expr("g")));
    }

    #[test]
    fn test_custom_base_units() {
        let table = UnitTable::with_base_units(["m"]);
        assert_eq!(table.parse("GPa").power, 0);
        assert_eq!(table.parse("km").power, 3);
    }

    #[test]
    fn test_prefix_lookup() {
        assert_eq!(prefix_by_symbol("μ").map(|p| p.label), Some("Micro"));
        assert_eq!(prefix_by_symbol("Y").map(|p| p.power), Some(24));
        assert!(prefix_by_symbol("q").is_none());
    }
}
