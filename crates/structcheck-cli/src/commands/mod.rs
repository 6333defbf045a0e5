pub mod check;
pub mod repair;

use crate::cli::CommonArgs;
use crate::error::{CliError, Result};
use std::path::Path;
use structcheck::core::io::pdb::PdbFile;
use structcheck::core::io::traits::StructureFile;
use structcheck::core::models::structure::Structure;
use structcheck::core::topology::registry::TopologyRegistry;
use structcheck::engine::error::EngineError;
use structcheck::engine::report::Report;
use tracing::{info, warn};

/// Builds the topology reference: the built-in templates, extended or overridden by the file
/// given with `--topology`.
pub(crate) fn load_registry(args: &CommonArgs) -> Result<TopologyRegistry> {
    let mut registry = TopologyRegistry::builtin().map_err(EngineError::Topology)?;
    if let Some(path) = &args.topology {
        info!("Loading residue templates from {:?}", path);
        let extra = TopologyRegistry::load(path).map_err(EngineError::Topology)?;
        registry.extend(extra);
    }
    Ok(registry)
}

/// Reads the input structure, logging every record the loader skipped or patched.
pub(crate) fn load_structure(path: &Path, registry: &TopologyRegistry) -> Result<Structure> {
    info!("Loading input structure from {:?}", path);
    let loaded = PdbFile::read_from_path(path, registry).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    for warning in &loaded.warnings {
        warn!("Record {}: {}", warning.record, warning.kind);
    }
    if !loaded.warnings.is_empty() {
        println!(
            "Warning: {} record(s) in {} could not be read cleanly; see the log for details.",
            loaded.warnings.len(),
            path.display()
        );
    }
    info!(
        models = loaded.structure.models().len(),
        atoms = loaded.structure.atom_count(),
        "Structure loaded."
    );
    Ok(loaded.structure)
}

pub(crate) fn write_json(value: &impl serde::Serialize, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, json).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    info!("Report written to {:?}", path);
    Ok(())
}

pub(crate) fn write_csv(report: &Report, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    report.write_csv(file).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    info!("Findings table written to {:?}", path);
    Ok(())
}
