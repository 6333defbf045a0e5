use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{self},
    prelude::*,
};

/// Module path prefix shared by the library and the binary.
const OWN_TARGET: &str = "structcheck";

/// Events from our own crates follow `-v`/`-q`; dependencies only ever report warnings.
fn log_targets(verbosity: u8, quiet: bool) -> Targets {
    let own = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    let others = own.min(LevelFilter::WARN);
    Targets::new().with_target(OWN_TARGET, own).with_default(others)
}

/// Installs the global subscriber: a compact stderr layer and, with `--log-file`, a plain
/// text copy carrying targets and thread ids for rayon workers.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(log_targets(verbosity, quiet))
        .with(stderr_layer);

    let installed = match log_file {
        Some(path) => {
            let sink = File::create(&path)?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(sink)
                        .with_ansi(false)
                        .with_thread_ids(true),
                )
                .try_init()
        }
        None => registry.try_init(),
    };
    installed.map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::Level;

    #[test]
    fn verbosity_applies_to_own_targets_only() {
        let targets = log_targets(2, false);
        assert!(targets.would_enable("structcheck::engine::checks", &Level::DEBUG));
        assert!(!targets.would_enable("structcheck::engine::checks", &Level::TRACE));
        assert!(!targets.would_enable("rayon_core", &Level::INFO));
        assert!(targets.would_enable("rayon_core", &Level::WARN));
    }

    #[test]
    fn default_and_quiet_levels() {
        assert!(log_targets(0, false).would_enable("structcheck", &Level::WARN));
        assert!(!log_targets(0, false).would_enable("structcheck", &Level::INFO));
        assert!(log_targets(5, false).would_enable("structcheck::workflows", &Level::TRACE));
        let quiet = log_targets(3, true);
        assert!(!quiet.would_enable("structcheck", &Level::ERROR));
        assert!(!quiet.would_enable("tokio", &Level::ERROR));
    }

    #[test]
    #[serial]
    fn file_copy_records_targets_and_thread_ids() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("repair.log");
        let sink = File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(log_targets(1, false))
            .with(fmt::layer().with_writer(sink).with_ansi(false).with_thread_ids(true));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "structcheck::workflows::repair", stage = "water_removal", "Stage applied.");
            tracing::info!(target: "hyper", "Dependency chatter.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("structcheck::workflows::repair"));
        assert!(content.contains("stage=\"water_removal\""));
        assert!(content.contains("ThreadId"));
        assert!(!content.contains("Dependency chatter."));
    }

    #[test]
    #[serial]
    fn unwritable_log_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(dir.path().to_path_buf()));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
