use std::path::PathBuf;
use structcheck::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Everything that makes the `structcheck` binary exit with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
    /// The check or repair workflow aborted (unreadable structure, missing model or chain,
    /// bad topology file, invalid thresholds).
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read '{}': {source}", path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot write '{}': {source}", path.display())]
    FileWriting {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
