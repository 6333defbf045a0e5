use crate::core::models::structure::Structure;
use crate::core::topology::registry::TopologyRegistry;
use crate::engine::checks;
use crate::engine::config::CheckConfig;
use crate::engine::context::CheckContext;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::report::{CheckKind, Report};
use tracing::{info, instrument};

/// Runs every check on the primary model of `structure` and merges the findings.
///
/// The structure is not modified, so running this twice on the same revision produces
/// identical reports.
#[instrument(skip_all, name = "check_workflow")]
pub fn run(
    structure: &Structure,
    registry: &TopologyRegistry,
    config: &CheckConfig,
    reporter: &ProgressReporter,
) -> Result<Report, EngineError> {
    config.validate()?;
    info!(
        revision = structure.revision(),
        models = structure.models().len(),
        atoms = structure.atom_count(),
        "Checking structure."
    );
    let report = assemble(structure, registry, config, reporter);
    info!(
        unresolved = report.unresolved,
        clashes = report.count(CheckKind::Clashes),
        "Check complete."
    );
    Ok(report)
}

/// Builds a report without validating `config` first.
pub(crate) fn assemble(
    structure: &Structure,
    registry: &TopologyRegistry,
    config: &CheckConfig,
    reporter: &ProgressReporter,
) -> Report {
    let ctx = reporter.phase("Analysis", || CheckContext::new(structure, registry, config));
    let sections = reporter.phase("Checks", || checks::run_all(&ctx, &CheckKind::ALL, reporter));
    Report::merge(
        structure.metadata().entry_id.clone(),
        structure.revision(),
        sections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ResidueKey;
    use crate::engine::progress::Progress;
    use crate::test_utils::{add_altloc_copy, contaminated_assembly, ideal_peptide_structure};
    use nalgebra::Vector3;
    use std::sync::Mutex;

    #[test]
    fn report_has_a_section_per_check() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = ideal_peptide_structure(&registry, &[("A", "MKTAYIAK")]);
        let report = run(&structure, &registry, &CheckConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(report.checks.len(), CheckKind::ALL.len());
        assert_eq!(report.revision, structure.revision());
        assert_eq!(report.count(CheckKind::Chirality), 0);
        assert_eq!(report.count(CheckKind::Sidechains), 0);
        assert_eq!(report.count(CheckKind::Backbone), 0);
    }

    #[test]
    fn rerunning_checks_gives_identical_json() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = contaminated_assembly(&registry);
        let config = CheckConfig::default();
        let first = run(&structure, &registry, &config, &ProgressReporter::new()).unwrap();
        let second = run(&structure, &registry, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
    }

    #[test]
    fn contaminated_assembly_is_diagnosed() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = contaminated_assembly(&registry);
        let report = run(&structure, &registry, &CheckConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(report.count(CheckKind::Chirality), 69);
        let split: std::collections::BTreeSet<_> = report
            .findings(CheckKind::Altloc)
            .iter()
            .filter_map(|f| f.residue())
            .collect();
        assert_eq!(split.len(), 5);
        assert_eq!(report.count(CheckKind::Metals), 8);
        assert_eq!(report.count(CheckKind::Ligands), 6);
        assert_eq!(report.count(CheckKind::Backbone), 3);
        assert!(report.count(CheckKind::Clashes) >= 4);
        assert!(report.unresolved > 0);
    }

    #[test]
    fn invalid_thresholds_abort_before_checking() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = ideal_peptide_structure(&registry, &[("A", "GG")]);
        let config = CheckConfig {
            disulfide_cutoff: -1.0,
            ..CheckConfig::default()
        };
        let result = run(&structure, &registry, &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn phases_are_reported_in_order() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = ideal_peptide_structure(&registry, &[("A", "GAG")]);
        let structure = add_altloc_copy(&structure, &ResidueKey::new("A", 2, None), Vector3::new(0.3, 0.0, 0.0), 0.5);
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let report = run(&structure, &registry, &CheckConfig::default(), &reporter).unwrap();
        assert_eq!(report.count(CheckKind::Altloc), 5);
        drop(reporter);
        assert_eq!(phases.into_inner().unwrap(), ["Analysis", "Checks"]);
    }
}
