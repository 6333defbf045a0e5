use super::{load_registry, load_structure, write_csv, write_json};
use crate::cli::RepairArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use crate::utils::summary::{diff_summary, notes_summary, report_summary};
use serde::Serialize;
use std::sync::Arc;
use structcheck::core::io::fasta;
use structcheck::core::io::pdb::PdbFile;
use structcheck::core::io::traits::StructureFile;
use structcheck::engine::collaborators::{Collaborators, FastaSequences};
use structcheck::engine::findings::RepairNote;
use structcheck::engine::progress::ProgressReporter;
use structcheck::engine::report::{Report, ReportDiff};
use structcheck::workflows::{self, repair::StageRecord};
use tracing::{info, warn};

/// Everything written by `--report` for a repair run.
#[derive(Serialize)]
struct RepairDocument<'a> {
    initial: &'a Report,
    #[serde(rename = "final")]
    repaired: &'a Report,
    diff: &'a ReportDiff,
    notes: &'a [RepairNote],
    stages: &'a [StageRecord],
}

pub async fn run(args: RepairArgs) -> Result<()> {
    let partial_config =
        PartialConfig::load(args.common.config.as_deref(), &args.common.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let pipeline_config = partial_config.merge_with_repair_args(&args)?;

    let registry = load_registry(&args.common)?;
    let structure = load_structure(&args.common.input, &registry)?;

    let mut collaborators = Collaborators::default();
    if let Some(path) = &args.sequence {
        info!("Loading canonical sequences from {:?}", path);
        let records = fasta::read_from_path(path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
        collaborators = collaborators.with_sequences(Arc::new(FastaSequences::new(&records)));
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Repairing {}...", args.common.input.display());
    info!("Invoking the core repair workflow...");
    let result = tokio::task::block_in_place(|| {
        workflows::repair::run(&structure, &registry, &pipeline_config, &collaborators, &reporter)
    })?;

    let applied: Vec<&str> = result
        .stages
        .iter()
        .filter(|record| record.applied)
        .map(|record| record.stage.name())
        .collect();
    info!("Stages that changed the structure: {:?}", applied);

    println!("{}", report_summary(&result.final_report));
    println!("{}", diff_summary(&result.diff));
    if !result.notes.is_empty() {
        warn!("{} item(s) could not be repaired automatically.", result.notes.len());
        println!("Repair notes:\n{}", notes_summary(&result.notes));
    }

    PdbFile::write_to_path(&result.structure, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;
    println!("Repaired structure written to: {}", args.output.display());

    if let Some(path) = &args.common.report {
        let document = RepairDocument {
            initial: &result.initial_report,
            repaired: &result.final_report,
            diff: &result.diff,
            notes: &result.notes,
            stages: &result.stages,
        };
        write_json(&document, path)?;
        println!("Report written to: {}", path.display());
    }
    if let Some(path) = &args.common.csv {
        write_csv(&result.final_report, path)?;
        println!("Findings table written to: {}", path.display());
    }
    Ok(())
}
