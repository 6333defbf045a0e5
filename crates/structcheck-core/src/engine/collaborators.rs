//! Capability interfaces for the external collaborators the repair engine delegates to.
//!
//! Collaborators are reached through traits so the core never depends on a particular
//! modeling or minimization backend. Every invocation runs on a worker thread with an
//! explicit timeout; a timed-out call is signalled to stop through its [`Cancellation`] and
//! reported as [`CollaboratorError::Timeout`].

use super::config::{ClashThresholds, MinimizationParams};
use super::findings::Finding;
use super::minimizer::SteepestDescentMinimizer;
use crate::core::io::fasta::FastaRecord;
use crate::core::models::structure::Structure;
use crate::core::topology::chemistry::AtomChemistry;
use nalgebra::Point3;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("Collaborator did not answer within {after:?}")]
    Timeout { after: Duration },
    #[error("Numerical non-convergence: {0}")]
    NonConvergence(String),
    #[error("Collaborator returned unusable output: {0}")]
    InvalidOutput(String),
    #[error("Collaborator worker terminated without a result")]
    Disconnected,
}

/// Cooperative cancellation flag shared with a running collaborator.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Canonical one-letter sequences, per chain with an optional fallback for chains not named.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalSequence {
    pub by_chain: HashMap<String, String>,
    pub fallback: Option<String>,
}

impl CanonicalSequence {
    pub fn for_chain(&self, chain: &str) -> Option<&str> {
        self.by_chain
            .get(chain)
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_chain.is_empty() && self.fallback.is_none()
    }

    /// Maps every chain named in a record header to its sequence; the first record also
    /// serves as the fallback.
    pub fn from_fasta(records: &[FastaRecord]) -> Self {
        let mut by_chain = HashMap::new();
        for record in records {
            for chain in record.chains() {
                by_chain.entry(chain).or_insert_with(|| record.sequence.clone());
            }
        }
        Self {
            by_chain,
            fallback: records.first().map(|r| r.sequence.clone()),
        }
    }
}

pub trait SequenceProvider: Send + Sync {
    /// Canonical sequence for `entry_id`, or `None` when the provider has none.
    fn canonical_sequence(&self, entry_id: Option<&str>) -> Result<Option<CanonicalSequence>, CollaboratorError>;
}

/// Provider used when no reference sequence is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSequence;

impl SequenceProvider for NoSequence {
    fn canonical_sequence(&self, _entry_id: Option<&str>) -> Result<Option<CanonicalSequence>, CollaboratorError> {
        Ok(None)
    }
}

/// Provider backed by already-parsed FASTA records.
#[derive(Debug, Clone)]
pub struct FastaSequences {
    sequence: CanonicalSequence,
}

impl FastaSequences {
    pub fn new(records: &[FastaRecord]) -> Self {
        Self {
            sequence: CanonicalSequence::from_fasta(records),
        }
    }
}

impl SequenceProvider for FastaSequences {
    fn canonical_sequence(&self, _entry_id: Option<&str>) -> Result<Option<CanonicalSequence>, CollaboratorError> {
        Ok((!self.sequence.is_empty()).then(|| self.sequence.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct ModelingRequest {
    pub structure: Structure,
    pub sequence: Option<CanonicalSequence>,
    /// Backbone findings still open after local completion.
    pub gaps: Vec<Finding>,
    pub license: Option<String>,
}

pub trait HomologyModeler: Send + Sync {
    /// Returns a structure with backbone atoms reconstructed for the requested gaps.
    fn rebuild_backbone(&self, request: ModelingRequest, cancel: &Cancellation) -> Result<Structure, CollaboratorError>;
}

/// Default modeler: no modeling engine is linked in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModeler;

impl HomologyModeler for UnavailableModeler {
    fn rebuild_backbone(&self, _request: ModelingRequest, _cancel: &Cancellation) -> Result<Structure, CollaboratorError> {
        Err(CollaboratorError::Unavailable(
            "no homology modeling engine is configured".to_string(),
        ))
    }
}

/// Coordinates plus the topology the minimizer needs, over a flat atom list.
#[derive(Debug, Clone)]
pub struct MinimizationProblem {
    pub positions: Vec<Point3<f64>>,
    /// Covalent bonds `(i, j, reference_length)`.
    pub bonds: Vec<(usize, usize, f64)>,
    /// Per-atom sorted lists of atoms excluded from non-bonded terms.
    pub exclusions: Vec<Vec<usize>>,
    pub chemistry: Vec<AtomChemistry>,
    /// Atoms taking part in non-bonded repulsion.
    pub active: Vec<bool>,
    pub thresholds: ClashThresholds,
    pub params: MinimizationParams,
}

#[derive(Debug, Clone)]
pub struct MinimizationOutcome {
    pub coordinates: Vec<Point3<f64>>,
    pub iterations: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub converged: bool,
}

pub trait EnergyMinimizer: Send + Sync {
    fn minimize(&self, problem: MinimizationProblem, cancel: &Cancellation) -> Result<MinimizationOutcome, CollaboratorError>;
}

/// The set of collaborators a repair run may call.
#[derive(Clone)]
pub struct Collaborators {
    pub sequences: Arc<dyn SequenceProvider>,
    pub modeler: Arc<dyn HomologyModeler>,
    pub minimizer: Arc<dyn EnergyMinimizer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            sequences: Arc::new(NoSequence),
            modeler: Arc::new(UnavailableModeler),
            minimizer: Arc::new(SteepestDescentMinimizer),
        }
    }
}

impl Collaborators {
    pub fn with_sequences(mut self, sequences: Arc<dyn SequenceProvider>) -> Self {
        self.sequences = sequences;
        self
    }

    pub fn with_modeler(mut self, modeler: Arc<dyn HomologyModeler>) -> Self {
        self.modeler = modeler;
        self
    }

    pub fn with_minimizer(mut self, minimizer: Arc<dyn EnergyMinimizer>) -> Self {
        self.minimizer = minimizer;
        self
    }
}

/// Runs `call` on a worker thread and waits at most `timeout` for its answer.
///
/// On timeout the cancellation flag is raised and the worker is left to wind down on its
/// own; its late result is discarded.
pub fn invoke_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce(&Cancellation) -> Result<T, CollaboratorError> + Send + 'static,
{
    let cancel = Cancellation::new();
    let worker_cancel = cancel.clone();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a timeout.
        let _ = tx.send(call(&worker_cancel));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.cancel();
            warn!(?timeout, "Collaborator timed out; cancellation requested.");
            Err(CollaboratorError::Timeout { after: timeout })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CollaboratorError::Disconnected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fasta_sequences_map_header_chains() {
        let records = crate::core::io::fasta::parse(&mut Cursor::new(
            ">1ABC_1|Chains A, B|X\nGSKT\n>1ABC_2|Chain C|Y\nMK\n",
        ))
        .unwrap();
        let provider = FastaSequences::new(&records);
        let sequence = provider.canonical_sequence(None).unwrap().unwrap();
        assert_eq!(sequence.for_chain("B"), Some("GSKT"));
        assert_eq!(sequence.for_chain("C"), Some("MK"));
        assert_eq!(sequence.for_chain("Z"), Some("GSKT"));
        assert!(NoSequence.canonical_sequence(Some("1ABC")).unwrap().is_none());
    }

    #[test]
    fn slow_collaborator_times_out_and_is_cancelled() {
        let observed = Cancellation::new();
        let seen = observed.clone();
        let result: Result<(), _> = invoke_with_timeout(Duration::from_millis(20), move |cancel| {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            seen.cancel();
            Ok(())
        });
        assert!(matches!(result, Err(CollaboratorError::Timeout { .. })));
        for _ in 0..200 {
            if observed.is_cancelled() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(observed.is_cancelled());
    }

    #[test]
    fn fast_collaborator_result_is_returned() {
        let value = invoke_with_timeout(Duration::from_secs(5), |_| Ok(42)).unwrap();
        assert_eq!(value, 42);
        let err = invoke_with_timeout::<(), _>(Duration::from_secs(5), |_| {
            Err(CollaboratorError::Unavailable("license".into()))
        })
        .unwrap_err();
        assert_eq!(err, CollaboratorError::Unavailable("license".into()));
    }
}
