use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The structcheck developers",
    version,
    about = "structcheck - Diagnose and repair deposited biomolecular structures before simulation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel checks.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every check on a structure and report the findings.
    Check(CheckArgs),
    /// Repair a structure and report what changed.
    Repair(RepairArgs),
}

/// Options shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the input structure file (PDB format).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Residue template file extending or overriding the built-in topology reference.
    #[arg(long, value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// Write the report as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Write the findings as a CSV table to this path.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S checks.clashes.apolar=2.8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the `repair` subcommand.
#[derive(Args, Debug)]
pub struct RepairArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Path for the repaired structure (PDB format).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// FASTA file with the canonical sequence(s) used for renumbering and backbone modeling.
    #[arg(long, value_name = "PATH")]
    pub sequence: Option<PathBuf>,

    // --- Selection Overrides ---
    /// Model serial to keep.
    #[arg(long, value_name = "INT")]
    pub model: Option<usize>,

    /// Chains to keep, comma separated.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub chains: Option<Vec<String>>,

    /// Alternate location to keep: a label such as 'A', or 'occupancy' for the most occupied one.
    #[arg(long, value_name = "LABEL")]
    pub altloc: Option<String>,

    // --- Removal Overrides ---
    /// Heteroatom residues to remove: 'all', 'none' or a comma-separated list of names.
    #[arg(long, value_name = "SELECTOR")]
    pub remove_ligands: Option<String>,

    /// Keep water molecules.
    #[arg(long)]
    pub keep_water: bool,

    /// Keep hydrogen atoms.
    #[arg(long)]
    pub keep_hydrogens: bool,

    // --- Repair Overrides ---
    /// Skip clash relief by energy minimization.
    #[arg(long)]
    pub no_minimize: bool,

    /// Keep the original chain identifiers and residue numbers.
    #[arg(long)]
    pub no_renumber: bool,

    /// Maximum number of passes over the geometric repair stages.
    #[arg(long, value_name = "INT")]
    pub max_cycles: Option<usize>,
}
