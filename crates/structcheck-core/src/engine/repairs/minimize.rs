use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::structure::Structure;
use crate::engine::checks::clashes;
use crate::engine::collaborators::{CollaboratorError, MinimizationProblem, invoke_with_timeout};
use crate::engine::context::CheckContext;
use crate::engine::findings::{NoteKind, RepairNote};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Partners of atom `i` that carry no contact restraint: the excluded and vicinal sets.
fn shielded(analysis: &CheckContext, i: usize) -> Vec<usize> {
    let connectivity = &analysis.connectivity;
    let mut partners: Vec<usize> =
        connectivity.excluded(i).iter().chain(connectivity.vicinal(i)).copied().collect();
    partners.sort_unstable();
    partners
}

fn problem(analysis: &CheckContext, ctx: &RepairContext) -> MinimizationProblem {
    let n = analysis.positions.len();
    let bonds = analysis
        .connectivity
        .bonds()
        .into_iter()
        .map(|(i, j)| (i, j, nalgebra::distance(&analysis.positions[i], &analysis.positions[j])))
        .collect();
    MinimizationProblem {
        positions: analysis.positions.clone(),
        bonds,
        exclusions: (0..n).map(|i| shielded(analysis, i)).collect(),
        chemistry: analysis.chemistry.clone(),
        active: (0..n).map(|i| clashes::is_contact_atom(analysis, i)).collect(),
        thresholds: ctx.checks.clashes,
        params: ctx.config.minimization,
    }
}

/// Relieves clashes by restrained minimization of the primary model.
///
/// Covalent bonds are held at their current lengths. When the minimizer fails or answers
/// late, the coordinates are left as they were and the failure is recorded as a note.
pub fn relieve(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.relieve_clashes {
        return StageOutcome::unchanged();
    }
    let stage = RepairStage::ClashRelief.name();
    let analysis = ctx.analyze(structure);
    let clash_count = clashes::run(&analysis).len();
    if clash_count == 0 {
        return StageOutcome::unchanged();
    }
    let problem = problem(&analysis, ctx);
    let sites = analysis.sites.clone();
    let minimizer = Arc::clone(&ctx.collaborators.minimizer);
    info!(clashes = clash_count, atoms = sites.len(), "Relieving clashes by minimization.");

    let outcome = match invoke_with_timeout(ctx.config.collaborators.minimization_timeout, move |cancel| {
        minimizer.minimize(problem, cancel)
    }) {
        Ok(outcome) => outcome,
        Err(CollaboratorError::NonConvergence(reason)) => {
            warn!(%reason, "Minimization diverged; coordinates kept.");
            return StageOutcome::unchanged()
                .with_notes(vec![RepairNote::new(stage, NoteKind::NumericNonConvergence, reason)]);
        }
        Err(e) => {
            warn!(error = %e, "Minimizer unavailable; coordinates kept.");
            return StageOutcome::unchanged()
                .with_notes(vec![RepairNote::new(stage, NoteKind::CollaboratorUnavailable, e.to_string())]);
        }
    };

    if outcome.coordinates.len() != sites.len()
        || outcome.coordinates.iter().any(|p| !p.coords.iter().all(|c| c.is_finite()))
    {
        warn!(returned = outcome.coordinates.len(), expected = sites.len(), "Minimizer output rejected.");
        return StageOutcome::unchanged().with_notes(vec![RepairNote::new(
            stage,
            NoteKind::CollaboratorUnavailable,
            format!(
                "minimizer returned {} usable coordinates for {} atoms",
                outcome.coordinates.len(),
                sites.len()
            ),
        )]);
    }
    if outcome.final_energy >= outcome.initial_energy {
        debug!(energy = outcome.initial_energy, "Minimization made no progress.");
        return StageOutcome::unchanged();
    }
    debug!(
        iterations = outcome.iterations,
        initial = outcome.initial_energy,
        last = outcome.final_energy,
        converged = outcome.converged,
        "Minimization accepted."
    );

    let primary = structure.primary_model().index;
    StageOutcome::changed(structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for (site, position) in sites.iter().zip(&outcome.coordinates) {
            model.chains_mut()[site.chain].residues_mut()[site.residue].atoms_mut()[site.atom].position = *position;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ResidueKey;
    use crate::core::topology::registry::TopologyRegistry;
    use crate::engine::collaborators::{Cancellation, Collaborators, EnergyMinimizer, MinimizationOutcome};
    use crate::engine::config::{CheckConfig, RepairConfig, RepairConfigBuilder};
    use crate::test_utils::{add_hetero_residue, ideal_peptide_structure};
    use nalgebra::Point3;

    fn crowded_ions(registry: &TopologyRegistry) -> Structure {
        let structure = ideal_peptide_structure(registry, &[("A", "G")]);
        let structure = add_hetero_residue(registry, &structure, "A", 201, "NA", &[("NA", "NA", Point3::new(20.0, 0.0, 0.0))]);
        add_hetero_residue(registry, &structure, "A", 202, "NA", &[("NA", "NA", Point3::new(23.0, 0.0, 0.0))])
    }

    fn relieve_with(structure: &Structure, config: &RepairConfig, collaborators: &Collaborators) -> StageOutcome {
        let registry = TopologyRegistry::builtin().unwrap();
        let checks = CheckConfig::default();
        let ctx = RepairContext {
            registry: &registry,
            checks: &checks,
            config,
            collaborators,
        };
        relieve(structure, &ctx)
    }

    #[test]
    fn like_charged_ions_are_separated() {
        let registry = TopologyRegistry::builtin().unwrap();
        let structure = crowded_ions(&registry);
        let outcome = relieve_with(&structure, &RepairConfig::default(), &Collaborators::default());
        assert!(outcome.notes.is_empty());
        let revised = outcome.structure.unwrap();
        let model = revised.primary_model();
        let first = model.find_residue(&ResidueKey::new("A", 201, None)).unwrap().atoms()[0].position;
        let second = model.find_residue(&ResidueKey::new("A", 202, None)).unwrap().atoms()[0].position;
        assert!(nalgebra::distance(&first, &second) > CheckConfig::default().clashes.ionic);

        let checks = CheckConfig::default();
        let analysis = CheckContext::new(&revised, &registry, &checks);
        assert!(clashes::run(&analysis).is_empty());
        let again = relieve_with(&revised, &RepairConfig::default(), &Collaborators::default());
        assert!(!again.is_changed());
    }

    #[test]
    fn disabled_stage_leaves_clashes() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = RepairConfigBuilder::new().relieve_clashes(false).build().unwrap();
        let outcome = relieve_with(&crowded_ions(&registry), &config, &Collaborators::default());
        assert!(!outcome.is_changed());
    }

    struct DivergingMinimizer;

    impl EnergyMinimizer for DivergingMinimizer {
        fn minimize(&self, _problem: MinimizationProblem, _cancel: &Cancellation) -> Result<MinimizationOutcome, CollaboratorError> {
            Err(CollaboratorError::NonConvergence("energy became NaN".into()))
        }
    }

    #[test]
    fn divergence_keeps_coordinates_and_notes_it() {
        let registry = TopologyRegistry::builtin().unwrap();
        let collaborators = Collaborators::default().with_minimizer(Arc::new(DivergingMinimizer));
        let outcome = relieve_with(&crowded_ions(&registry), &RepairConfig::default(), &collaborators);
        assert!(!outcome.is_changed());
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].kind, NoteKind::NumericNonConvergence);
    }
}
