//! Command-line parsing for the `mech` tool.
//!
//! Argument types live here; dispatch and output live in `main.rs`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mech", version, about = "Fibre mechanics: unit normalization, cross-sections and bundle simulation")]
pub struct Cli {
    /// Settings file (JSON); built-in defaults when omitted.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize trait measurements to their default units.
    #[command(subcommand)]
    Units(UnitsCommand),
    /// Compare cross-sections and rescale mechanical traits.
    #[command(subcommand)]
    CrossSection(CrossSectionCommand),
    /// Area and equivalent diameter of a set of fibres.
    EquivDiameter(EquivDiameterArgs),
    /// Simulate a bundle of linear-elastic fibres.
    Linear(BundleArgs),
    /// Simulate a bundle with hyperelastic fibres and Weibull failure.
    Nonlinear(NonLinearArgs),
}

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    /// Show what a conversion would do without changing anything.
    Preview(TraitFileArgs),
    /// Convert and write the updated records.
    Apply(UnitsApplyArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TraitFileArgs {
    /// JSON array of trait records.
    #[arg(long)]
    pub traits: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct UnitsApplyArgs {
    #[command(flatten)]
    pub input: TraitFileArgs,

    /// Where to write the updated records; the input file when omitted.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum CrossSectionCommand {
    /// Baseline vs comparison totals and the resulting ratio.
    Compare(SelectionArgs),
    /// Preview or apply a diameter conversion.
    Apply(ConvertArgs),
    /// Undo every diameter conversion.
    Reset(RecordFilesArgs),
}

/// Which diameter traits form each column of the comparison.
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    #[command(flatten)]
    pub input: TraitFileArgs,

    /// Diameter trait ids for the baseline; every diameter trait when omitted.
    #[arg(long = "include", value_name = "ID")]
    pub included: Vec<String>,

    /// Diameter trait ids for the comparison column.
    #[arg(long = "compare", value_name = "ID")]
    pub compared: Vec<String>,

    /// Fibre-count override for a compared trait, as `ID=ORIGINAL:NEW`.
    #[arg(long = "fibres", value_name = "ID=ORIGINAL:NEW")]
    pub fibre_counts: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RecordFilesArgs {
    #[command(flatten)]
    pub input: TraitFileArgs,

    /// JSON array of experiment records.
    #[arg(long)]
    pub experiments: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// JSON array of experiment records.
    #[arg(long)]
    pub experiments: Option<PathBuf>,

    /// Experiment groups to rescale; all groups when omitted.
    #[arg(long = "group", value_name = "EXPERIMENT")]
    pub groups: Vec<String>,

    /// Write the converted records instead of only previewing.
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EquivDiameterArgs {
    /// Fibre diameter and count, as `DIAMETER:COUNT` (repeatable).
    #[arg(long = "fibre", value_name = "DIAMETER:COUNT", required = true)]
    pub fibres: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct BundleArgs {
    /// Fibre table, CSV or JSON by extension.
    pub fibres: PathBuf,

    /// Write the plot data table as CSV.
    #[arg(long)]
    pub plot_csv: Option<PathBuf>,

    /// Print the summary only, without the sampled curves.
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Debug, Args, Clone)]
pub struct NonLinearArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Random seed for the breaking strains; entropy when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}
