//! # mech CLI
//!
//! Scriptable frontend for `mech_core`. Every command prints JSON on stdout;
//! logs go to stderr. Record files are JSON arrays and are rewritten
//! atomically when a command changes them.

mod cli;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{
    BundleArgs, Cli, Command, ConvertArgs, CrossSectionCommand, EquivDiameterArgs, NonLinearArgs, RecordFilesArgs,
    SelectionArgs, UnitsCommand,
};
use mech_core::bundle::{
    compute_linear_bundle_with, compute_nonlinear_bundle, compute_nonlinear_bundle_seeded, import_fibre_csv,
    import_fibre_json, plot_data_csv, BundleCurves, FibreImport, NonLinearModel, RawFibreRow,
};
use mech_core::cross_section::{
    compare_cross_sections, equivalent_diameter, group_mechanical_traits, total_area, ConversionResult,
    ConversionWorkflow, CrossSectionSelection, FibreCountOverride,
};
use mech_core::file_io::{load_json, load_settings, read_text, save_json, write_text_atomic};
use mech_core::{ExperimentRecord, MechError, MechResult, Settings, TraitRecord};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> MechResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> MechResult<()> {
    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Units(UnitsCommand::Preview(args)) => {
            let records: Vec<TraitRecord> = load_json(&args.traits)?;
            print_json(&settings.normalizer().preview(&records))
        }
        Command::Units(UnitsCommand::Apply(args)) => {
            let records: Vec<TraitRecord> = load_json(&args.input.traits)?;
            let report = settings.normalizer().convert_traits(&records, Utc::now());
            let out = args.out.unwrap_or(args.input.traits);
            save_json(&report.updated, &out)?;
            info!(path = %out.display(), converted = report.converted, "Wrote normalized traits");
            print_json(&json!({
                "totalTraits": report.total_traits,
                "converted": report.converted,
                "skipped": report.skipped,
                "details": report.details,
            }))
        }
        Command::CrossSection(CrossSectionCommand::Compare(args)) => compare(&args),
        Command::CrossSection(CrossSectionCommand::Apply(args)) => convert(&args),
        Command::CrossSection(CrossSectionCommand::Reset(args)) => reset(&args),
        Command::EquivDiameter(args) => equiv_diameter(&args),
        Command::Linear(args) => linear(&args, &settings),
        Command::Nonlinear(args) => nonlinear(&args, &settings),
    }
}

/// Parse `ID=ORIGINAL:NEW`.
fn parse_fibre_override(text: &str) -> MechResult<(String, FibreCountOverride)> {
    let invalid = || MechError::invalid_input("fibres", text, "Expected ID=ORIGINAL:NEW");
    let (id, counts) = text.split_once('=').ok_or_else(invalid)?;
    let (original, new) = counts.split_once(':').ok_or_else(invalid)?;
    Ok((id.trim().to_string(), FibreCountOverride::new(original.trim(), new.trim())))
}

fn build_selection(records: &[TraitRecord], args: &SelectionArgs) -> MechResult<CrossSectionSelection> {
    let mut selection = CrossSectionSelection::initial(records);
    if !args.included.is_empty() {
        selection.included = args.included.iter().cloned().collect();
    }
    selection.compared = args.compared.iter().cloned().collect();
    for text in &args.fibre_counts {
        let (id, counts) = parse_fibre_override(text)?;
        selection.fibre_counts.insert(id, counts);
    }
    Ok(selection)
}

fn compare(args: &SelectionArgs) -> MechResult<()> {
    let records: Vec<TraitRecord> = load_json(&args.input.traits)?;
    let selection = build_selection(&records, args)?;
    let comparison = compare_cross_sections(&records, &selection).ok_or_else(|| {
        MechError::calculation_failed("cross-section comparison", "No diameter traits with a measurement")
    })?;
    print_json(&json!({
        "comparison": comparison,
        "percentChange": comparison.percent_change(),
    }))
}

fn load_experiments(path: Option<&PathBuf>) -> MechResult<Vec<ExperimentRecord>> {
    match path {
        Some(path) => load_json(path),
        None => Ok(Vec::new()),
    }
}

/// Replace records whose id matches an updated one.
fn merge_by_id<T>(records: &mut [T], updated: Vec<T>, id: impl Fn(&T) -> &str) {
    for record in updated {
        if let Some(slot) = records.iter_mut().find(|r| id(&**r) == id(&record)) {
            *slot = record;
        }
    }
}

/// Write a conversion result back into the record files.
fn save_result(
    mut records: Vec<TraitRecord>,
    traits_path: &Path,
    mut experiments: Vec<ExperimentRecord>,
    experiments_path: Option<&PathBuf>,
    result: &ConversionResult,
) -> MechResult<()> {
    merge_by_id(&mut records, result.traits.clone(), |r| r.id.as_str());
    save_json(&records, traits_path)?;
    if let Some(path) = experiments_path {
        merge_by_id(&mut experiments, result.experiments.clone(), |e| e.id.as_str());
        save_json(&experiments, path)?;
    }
    Ok(())
}

fn convert(args: &ConvertArgs) -> MechResult<()> {
    let traits_path = &args.selection.input.traits;
    let records: Vec<TraitRecord> = load_json(traits_path)?;
    let experiments = load_experiments(args.experiments.as_ref())?;
    let selection = build_selection(&records, &args.selection)?;
    let groups: BTreeSet<String> = if args.groups.is_empty() {
        group_mechanical_traits(&records).into_keys().collect()
    } else {
        args.groups.iter().cloned().collect()
    };

    let mut workflow = ConversionWorkflow::new();
    workflow.request_preview()?;
    let pending = workflow.build_preview(&records, &selection, &groups)?.clone();
    if !args.confirm {
        debug!(changes = pending.changes.len(), "Preview only");
        return print_json(&pending);
    }

    workflow.request_confirm()?;
    let result = workflow.apply(&records, &experiments, Utc::now())?;
    save_result(records, traits_path, experiments, args.experiments.as_ref(), &result)?;
    print_json(&json!({
        "ratio": pending.plan.ratio,
        "traits": result.traits.len(),
        "experiments": result.experiments.len(),
    }))
}

fn reset(args: &RecordFilesArgs) -> MechResult<()> {
    let records: Vec<TraitRecord> = load_json(&args.input.traits)?;
    let experiments = load_experiments(args.experiments.as_ref())?;

    let mut workflow = ConversionWorkflow::new();
    let result = workflow.reset(&records, &experiments, Utc::now())?;
    save_result(records, &args.input.traits, experiments, args.experiments.as_ref(), &result)?;
    print_json(&json!({
        "traits": result.traits.len(),
        "experiments": result.experiments.len(),
    }))
}

/// Parse `DIAMETER:COUNT`.
fn parse_fibre(text: &str) -> MechResult<(f64, f64)> {
    let invalid = || MechError::invalid_input("fibre", text, "Expected DIAMETER:COUNT with positive numbers");
    let (diameter, count) = text.split_once(':').ok_or_else(invalid)?;
    let diameter: f64 = diameter.trim().parse().map_err(|_| invalid())?;
    let count: f64 = count.trim().parse().map_err(|_| invalid())?;
    if diameter <= 0.0 || count <= 0.0 {
        return Err(invalid());
    }
    Ok((diameter, count))
}

fn equiv_diameter(args: &EquivDiameterArgs) -> MechResult<()> {
    let fibres = args.fibres.iter().map(|f| parse_fibre(f)).collect::<MechResult<Vec<_>>>()?;
    let area = total_area(&fibres);
    print_json(&json!({
        "totalArea": area,
        "equivalentDiameter": equivalent_diameter(area),
    }))
}

/// Fibre rows from CSV, or rows plus parameter blocks from JSON.
fn read_fibres(path: &Path) -> MechResult<(Vec<RawFibreRow>, Option<FibreImport>)> {
    let text = read_text(path)?;
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok((import_fibre_csv(&text)?, None))
    } else {
        let import = import_fibre_json(&text)?;
        Ok((import.rows.clone(), Some(import)))
    }
}

fn no_fibres(path: &Path) -> MechError {
    MechError::invalid_input("fibres", path.display().to_string(), "No complete fibre rows")
}

fn write_plot_data(args: &BundleArgs, curves: &BundleCurves) -> MechResult<()> {
    if let Some(path) = &args.plot_csv {
        write_text_atomic(path, &plot_data_csv(curves)?)?;
        info!(path = %path.display(), "Wrote plot data");
    }
    Ok(())
}

fn linear(args: &BundleArgs, settings: &Settings) -> MechResult<()> {
    let (rows, _) = read_fibres(&args.fibres)?;
    let result = compute_linear_bundle_with(&rows, &settings.bundle.options)?.ok_or_else(|| no_fibres(&args.fibres))?;
    write_plot_data(args, &result.curves)?;
    if args.summary_only {
        print_json(&result.summary)
    } else {
        print_json(&result)
    }
}

fn nonlinear(args: &NonLinearArgs, settings: &Settings) -> MechResult<()> {
    let path = &args.bundle.fibres;
    let (rows, import) = read_fibres(path)?;
    let base = NonLinearModel::from(&settings.bundle);
    let model = match &import {
        Some(import) => import.model_with(base),
        None => base,
    };

    let result = match args.seed {
        Some(seed) => compute_nonlinear_bundle_seeded(&rows, &model, seed)?,
        None => compute_nonlinear_bundle(&rows, &model, &mut rand::thread_rng())?,
    }
    .ok_or_else(|| no_fibres(path))?;

    write_plot_data(&args.bundle, &result.curves)?;
    if args.bundle.summary_only {
        print_json(&result.summary)
    } else {
        print_json(&result)
    }
}
