use super::{load_registry, load_structure, write_csv, write_json};
use crate::cli::CheckArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::summary::report_summary;
use structcheck::engine::progress::ProgressReporter;
use structcheck::workflows;
use tracing::info;

pub async fn run(args: CheckArgs) -> Result<()> {
    let check_config = config::check_config(&args.common)?;
    let registry = load_registry(&args.common)?;
    let structure = load_structure(&args.common.input, &registry)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Checking {}...", args.common.input.display());
    info!("Invoking the core check workflow...");
    let report = tokio::task::block_in_place(|| {
        workflows::check::run(&structure, &registry, &check_config, &reporter)
    })?;

    println!("{}", report_summary(&report));

    if let Some(path) = &args.common.report {
        write_json(&report, path)?;
        println!("Report written to: {}", path.display());
    }
    if let Some(path) = &args.common.csv {
        write_csv(&report, path)?;
        println!("Findings table written to: {}", path.display());
    }
    Ok(())
}
