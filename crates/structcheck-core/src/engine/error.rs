use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::builder::ParseError;
use crate::core::models::structure::ModelError;
use crate::core::topology::registry::TopologyLoadError;

/// Failures that abort a check or repair run.
///
/// Recoverable conditions (unknown residues, ambiguous altlocs, unavailable collaborators,
/// non-converged minimization) are not errors; they are reported as findings or repair notes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Structure could not be loaded: {0}")]
    Parse(#[from] ParseError),

    #[error("Selection failed: {0}")]
    NotFound(#[from] ModelError),

    #[error("Topology reference error: {0}")]
    Topology(#[from] TopologyLoadError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Repair stage '{stage}' failed: {reason}")]
    Stage { stage: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
