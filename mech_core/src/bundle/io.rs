//! Fibre tables in and out: CSV and JSON import, CSV and JSON export, and the
//! tabular plot data of a computed bundle.
//!
//! CSV columns are found by keyword in the header (`name`/`type`,
//! `num`/`count`, `diameter`, `stress`, `strain`, `ref`, `humid`), so files
//! written by other tools load as long as their headers are descriptive.

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BundleCurves, HumidityParams, HyperelasticParams, NonLinearModel, RawFibreRow, WeibullParams};
use crate::errors::{MechError, MechResult};

const DEFAULT_NUM_FIBRES: &str = "1";
const DEFAULT_REFERENCE_DIAMETER: &str = "1.0";
const DEFAULT_HUMIDITY: &str = "50";

const EXPORT_HEADERS: [&str; 7] = [
    "Name",
    "Number of Fibres",
    "Diameter (μm)",
    "Stress at Break (GPa)",
    "Strain at Break",
    "Reference Diameter (μm)",
    "Humidity (%RH)",
];

/// Column positions resolved from a CSV header.
struct ColumnMap {
    name: usize,
    num_fibres: usize,
    diameter: usize,
    stress: usize,
    strain: usize,
    reference_diameter: Option<usize>,
    humidity: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> MechResult<Self> {
        let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let find = |keys: &[&str], exclude: Option<&str>| {
            lower.iter().position(|h| {
                keys.iter().any(|k| h.contains(k)) && exclude.map_or(true, |x| !h.contains(x))
            })
        };
        let require = |index: Option<usize>, field: &str| index.ok_or_else(|| MechError::missing_field(field));

        Ok(ColumnMap {
            name: require(find(&["name", "type"], None), "name")?,
            num_fibres: require(find(&["num", "count"], None), "numFibres")?,
            diameter: require(find(&["diameter"], Some("ref")), "diameter")?,
            stress: require(find(&["stress"], None), "stressAtBreak")?,
            strain: require(find(&["strain"], None), "strainAtBreak")?,
            reference_diameter: find(&["ref"], None),
            humidity: find(&["humid"], None),
        })
    }
}

fn cell(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Fill the optional fields of an imported row.
fn with_defaults(mut row: RawFibreRow, index: usize) -> RawFibreRow {
    if row.name.trim().is_empty() {
        row.name = format!("Fibre Type {}", index + 1);
    }
    row.num_fibres = or_default(row.num_fibres, DEFAULT_NUM_FIBRES);
    row.reference_diameter = or_default(row.reference_diameter, DEFAULT_REFERENCE_DIAMETER);
    row.humidity_value = or_default(row.humidity_value, DEFAULT_HUMIDITY);
    row
}

/// Parse a CSV fibre table.
///
/// The header must name the name, count, diameter, stress and strain
/// columns. Blank lines are skipped. A missing reference diameter falls back
/// to the row's own diameter.
pub fn import_fibre_csv(text: &str) -> MechResult<Vec<RawFibreRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let diameter = cell(&record, columns.diameter);
        let reference_diameter = columns
            .reference_diameter
            .map(|i| cell(&record, i))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| diameter.clone());
        let row = RawFibreRow {
            name: cell(&record, columns.name),
            num_fibres: cell(&record, columns.num_fibres),
            diameter,
            stress_at_break: cell(&record, columns.stress),
            strain_at_break: cell(&record, columns.strain),
            reference_diameter,
            humidity_value: columns.humidity.map(|i| cell(&record, i)).unwrap_or_default(),
        };
        rows.push(with_defaults(row, rows.len()));
    }

    debug!(rows = rows.len(), "Imported fibre CSV");
    Ok(rows)
}

/// Fibre rows plus any model parameters stored alongside them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibreImport {
    #[serde(rename = "fibreTypes")]
    pub rows: Vec<RawFibreRow>,
    #[serde(default, rename = "hyperelasticParams", skip_serializing_if = "Option::is_none")]
    pub hyperelastic: Option<HyperelasticParams>,
    #[serde(default, rename = "humidityParams", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<HumidityParams>,
    #[serde(default, rename = "weibullParams", skip_serializing_if = "Option::is_none")]
    pub weibull: Option<WeibullParams>,
}

impl FibreImport {
    /// `base` with every parameter block present in the import swapped in.
    pub fn model_with(&self, base: NonLinearModel) -> NonLinearModel {
        NonLinearModel {
            hyperelastic: self.hyperelastic.unwrap_or(base.hyperelastic),
            humidity: self.humidity.unwrap_or(base.humidity),
            weibull: self.weibull.unwrap_or(base.weibull),
            options: base.options,
        }
    }

    fn validate(&self) -> MechResult<()> {
        if let Some(params) = &self.hyperelastic {
            params.validate()?;
        }
        if let Some(params) = &self.humidity {
            params.validate()?;
        }
        if let Some(params) = &self.weibull {
            params.validate()?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FibreDocument {
    Rows(Vec<RawFibreRow>),
    Project(Box<FibreImport>),
}

/// Parse a JSON fibre document: either a bare array of fibre rows or an
/// object with `fibreTypes` and optional parameter blocks.
pub fn import_fibre_json(text: &str) -> MechResult<FibreImport> {
    let document: FibreDocument = serde_json::from_str(text).map_err(|_| {
        MechError::serialization("Expected an array of fibre types or an object with a fibreTypes array")
    })?;
    let mut import = match document {
        FibreDocument::Rows(rows) => FibreImport {
            rows,
            ..FibreImport::default()
        },
        FibreDocument::Project(import) => *import,
    };
    import.validate()?;
    import.rows = import
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| with_defaults(row, i))
        .collect();

    debug!(rows = import.rows.len(), "Imported fibre JSON");
    Ok(import)
}

/// Write fibre rows as CSV with descriptive headers.
pub fn export_fibre_csv(rows: &[RawFibreRow]) -> MechResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        writer.write_record([
            row.name.as_str(),
            row.num_fibres.as_str(),
            row.diameter.as_str(),
            row.stress_at_break.as_str(),
            row.strain_at_break.as_str(),
            row.reference_diameter.as_str(),
            row.humidity_value.as_str(),
        ])?;
    }
    finish_csv(writer)
}

/// Write fibre rows and the model parameters as one JSON document.
pub fn export_fibre_json(rows: &[RawFibreRow], model: &NonLinearModel) -> MechResult<String> {
    let document = FibreImport {
        rows: rows.to_vec(),
        hyperelastic: Some(model.hyperelastic),
        humidity: Some(model.humidity),
        weibull: Some(model.weibull),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// One row of the plot data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotDataRow {
    pub strain: f64,
    pub stress: f64,
    pub fibre_loads: Vec<f64>,
    pub total_load: f64,
    /// Running trapezoidal integral of the total load, scaled by 1e6
    pub cumulative_energy: f64,
}

/// Tabulate the curves point by point.
pub fn plot_data_rows(curves: &BundleCurves) -> Vec<PlotDataRow> {
    let mut energy = 0.0;
    curves
        .strain
        .iter()
        .enumerate()
        .map(|(i, strain)| {
            if i > 0 {
                let step = strain - curves.strain[i - 1];
                energy += 0.5 * (curves.total_load[i - 1] + curves.total_load[i]) * step * 1e6;
            }
            PlotDataRow {
                strain: *strain,
                stress: curves.stress[i],
                fibre_loads: curves.fibre_loads.iter().map(|series| series.load[i]).collect(),
                total_load: curves.total_load[i],
                cumulative_energy: energy,
            }
        })
        .collect()
}

/// The plot data table as CSV.
pub fn plot_data_csv(curves: &BundleCurves) -> MechResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut headers = vec!["Strain".to_string(), "Stress (GPa)".to_string()];
    headers.extend(curves.fibre_loads.iter().map(|series| format!("{} Load (N)", series.name)));
    headers.push("Total Load (N)".to_string());
    headers.push("Cumulative Energy (μJ)".to_string());
    writer.write_record(&headers)?;

    for row in plot_data_rows(curves) {
        let mut record = vec![row.strain.to_string(), row.stress.to_string()];
        record.extend(row.fibre_loads.iter().map(|load| load.to_string()));
        record.push(row.total_load.to_string());
        record.push(row.cumulative_energy.to_string());
        writer.write_record(&record)?;
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> MechResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| MechError::serialization(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| MechError::serialization(e.to_string()))
}
