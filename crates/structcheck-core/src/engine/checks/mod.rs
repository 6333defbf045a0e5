//! Diagnostic checks.
//!
//! Every check is a pure function of a [`CheckContext`] returning the findings of one
//! [`CheckKind`]. Checks never modify the structure and are independent of each other, so
//! [`run_all`] may evaluate them concurrently.

pub mod altloc;
pub mod amide;
pub mod chains;
pub mod chirality;
pub mod clashes;
pub mod completeness;
pub mod counts;
pub mod disulfides;
pub mod hetero;
pub mod models;

use super::context::CheckContext;
use super::findings::Finding;
use super::progress::Progress;
use super::progress::ProgressReporter;
use super::report::CheckKind;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub fn run_check(kind: CheckKind, ctx: &CheckContext) -> Vec<Finding> {
    let findings = match kind {
        CheckKind::Models => models::run(ctx),
        CheckKind::Chains => chains::run(ctx),
        CheckKind::Altloc => altloc::run(ctx),
        CheckKind::Disulfides => disulfides::run(ctx),
        CheckKind::Metals => hetero::run_metals(ctx),
        CheckKind::Ligands => hetero::run_ligands(ctx),
        CheckKind::Hydrogens => counts::run_hydrogens(ctx),
        CheckKind::Water => counts::run_water(ctx),
        CheckKind::Amide => amide::run(ctx),
        CheckKind::Chirality => chirality::run(ctx),
        CheckKind::Sidechains => completeness::run_sidechains(ctx),
        CheckKind::Backbone => completeness::run_backbone(ctx),
        CheckKind::Clashes => clashes::run(ctx),
        CheckKind::UnknownResidues => completeness::run_unknown(ctx),
    };
    trace!(check = %kind, findings = findings.len(), "Check finished.");
    findings
}

/// Runs the given checks, in parallel when the `parallel` feature is enabled. Results come
/// back in the order of `kinds`.
pub fn run_all(ctx: &CheckContext, kinds: &[CheckKind], reporter: &ProgressReporter) -> Vec<(CheckKind, Vec<Finding>)> {
    reporter.report(Progress::TaskStart {
        total_steps: kinds.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = kinds.iter();

    #[cfg(feature = "parallel")]
    let iterator = kinds.par_iter();

    let results = iterator
        .map(|&kind| {
            let findings = run_check(kind, ctx);
            reporter.report(Progress::TaskIncrement);
            (kind, findings)
        })
        .collect();

    reporter.report(Progress::TaskFinish);
    results
}
