use super::check;
use crate::core::models::ids::ResidueKey;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::TopologyRegistry;
use crate::engine::collaborators::Collaborators;
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::findings::RepairNote;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::repairs::{self, RepairContext, RepairStage};
use crate::engine::report::{Report, ReportDiff};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Stages run once, in order, before the geometric fixes.
const PREPARATION: [RepairStage; 7] = [
    RepairStage::ModelSelection,
    RepairStage::ChainSelection,
    RepairStage::AltlocResolution,
    RepairStage::DisulfideMarking,
    RepairStage::HeteroRemoval,
    RepairStage::HydrogenRemoval,
    RepairStage::WaterRemoval,
];

/// What one stage invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: RepairStage,
    /// Geometric cycle number, 0 for stages that run once.
    pub cycle: usize,
    pub applied: bool,
    pub atoms_before: usize,
    pub atoms_after: usize,
}

#[derive(Debug, Clone)]
pub struct RepairResult {
    /// The repaired structure, one revision after the input.
    pub structure: Structure,
    pub initial_report: Report,
    /// Report of the repaired structure, carrying every repair note.
    pub final_report: Report,
    /// Change between the initial report, translated to the final residue identities, and the
    /// final report.
    pub diff: ReportDiff,
    pub notes: Vec<RepairNote>,
    pub stages: Vec<StageRecord>,
}

/// Mutable state threaded through the stages of one run.
struct Pass<'a> {
    current: Structure,
    notes: Vec<RepairNote>,
    renamed: BTreeMap<ResidueKey, ResidueKey>,
    stages: Vec<StageRecord>,
    ctx: RepairContext<'a>,
}

impl<'a> Pass<'a> {
    fn apply(&mut self, stage: RepairStage, cycle: usize, reporter: &ProgressReporter) -> Result<bool, EngineError> {
        let atoms_before = self.current.atom_count();
        let outcome = reporter.phase(stage.name(), || repairs::apply(stage, &self.current, &self.ctx))?;
        let applied = outcome.is_changed();
        for note in outcome.notes {
            if !self.notes.contains(&note) {
                self.notes.push(note);
            }
        }
        self.compose_renames(outcome.renamed);
        if let Some(revised) = outcome.structure {
            self.current = revised;
        }
        let atoms_after = self.current.atom_count();
        debug!(stage = %stage, cycle, applied, atoms_before, atoms_after, "Stage finished.");
        self.stages.push(StageRecord {
            stage,
            cycle,
            applied,
            atoms_before,
            atoms_after,
        });
        Ok(applied)
    }

    /// Chains a stage's renames onto the ones recorded so far, keyed by the input identities.
    fn compose_renames(&mut self, renamed: BTreeMap<ResidueKey, ResidueKey>) {
        if renamed.is_empty() {
            return;
        }
        let mut pending = renamed;
        for target in self.renamed.values_mut() {
            if let Some(next) = pending.remove(target) {
                *target = next;
            }
        }
        self.renamed.extend(pending);
    }

    fn unresolved(&self) -> usize {
        check::assemble(&self.current, self.ctx.registry, self.ctx.checks, &ProgressReporter::new()).unresolved
    }
}

/// Runs the full check/repair pipeline on `structure`.
///
/// The input revision is never modified. Collaborator failures and other recoverable
/// conditions end up as notes on the final report; only selection and configuration errors
/// abort the run.
#[instrument(skip_all, name = "repair_workflow")]
pub fn run(
    structure: &Structure,
    registry: &TopologyRegistry,
    config: &PipelineConfig,
    collaborators: &Collaborators,
    reporter: &ProgressReporter,
) -> Result<RepairResult, EngineError> {
    config.validate()?;
    info!(
        revision = structure.revision(),
        atoms = structure.atom_count(),
        "Starting repair workflow."
    );

    // === Phase 1: Initial diagnosis ===
    let initial_report = reporter.phase("Initial Checks", || {
        check::assemble(structure, registry, &config.checks, reporter)
    });
    info!(unresolved = initial_report.unresolved, "Initial report assembled.");

    let mut pass = Pass {
        current: structure.clone(),
        notes: Vec::new(),
        renamed: BTreeMap::new(),
        stages: Vec::new(),
        ctx: RepairContext {
            registry,
            checks: &config.checks,
            config: &config.repair,
            collaborators,
        },
    };

    // === Phase 2: Selection and removal ===
    for stage in PREPARATION {
        pass.apply(stage, 0, reporter)?;
    }

    // === Phase 3: Geometric repair cycles ===
    let max_cycles = config.repair.max_cycles;
    let mut previous = (max_cycles > 1).then(|| pass.unresolved());
    for cycle in 1..=max_cycles {
        reporter.report(Progress::Message(format!("Repair cycle {cycle}/{max_cycles}")));
        let mut applied = false;
        for stage in RepairStage::GEOMETRIC {
            applied |= pass.apply(stage, cycle, reporter)?;
        }
        if !applied || cycle == max_cycles {
            break;
        }
        let unresolved = pass.unresolved();
        if previous.is_some_and(|p| unresolved >= p) {
            info!(cycle, unresolved, "Repair cycles stopped making progress.");
            break;
        }
        previous = Some(unresolved);
    }

    // === Phase 4: Renumbering ===
    pass.apply(RepairStage::Renumbering, 0, reporter)?;

    // === Phase 5: Final diagnosis and diff ===
    let Pass {
        current,
        mut notes,
        renamed,
        stages,
        ..
    } = pass;
    let repaired = current.with_revision(structure.revision() + 1);
    for note in &mut notes {
        if let Some(new) = note.residue.as_ref().and_then(|key| renamed.get(key)) {
            note.residue = Some(new.clone());
        }
    }

    let final_report = reporter.phase("Final Checks", || {
        check::assemble(&repaired, registry, &config.checks, reporter)
    });
    let final_report = final_report.with_notes(notes.clone());
    let diff = ReportDiff::between(&initial_report.remap_residues(&renamed), &final_report);
    if diff.severe_clashes_introduced > 0 {
        warn!(
            introduced = diff.severe_clashes_introduced,
            "Repair introduced severe clashes."
        );
    }

    info!(
        revision = repaired.revision(),
        atoms = repaired.atom_count(),
        unresolved_before = initial_report.unresolved,
        unresolved_after = final_report.unresolved,
        notes = notes.len(),
        "Repair workflow finished."
    );

    Ok(RepairResult {
        structure: repaired,
        initial_report,
        final_report,
        diff,
        notes,
        stages,
    })
}
