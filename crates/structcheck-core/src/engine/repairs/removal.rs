use super::{RepairContext, StageOutcome};
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::ResidueClass;
use crate::core::models::structure::Structure;
use crate::engine::checks::hetero;
use crate::engine::findings::Finding;
use std::collections::BTreeSet;
use tracing::info;

fn remove_residues(structure: &Structure, doomed: &BTreeSet<ResidueKey>) -> Structure {
    let primary = structure.primary_model().index;
    structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for chain in model.chains_mut() {
            let id = chain.id.clone();
            chain.residues_mut().retain(|r| !doomed.contains(&r.key(&id)));
        }
    })
}

/// Deletes metal and ligand residues whose name matches the configured selector.
pub fn remove_hetero(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    let analysis = ctx.analyze(structure);
    let doomed: BTreeSet<ResidueKey> = hetero::run_metals(&analysis)
        .into_iter()
        .chain(hetero::run_ligands(&analysis))
        .filter_map(|finding| match finding {
            Finding::MetalDetection { residue, name, .. } | Finding::LigandDetection { residue, name, .. }
                if ctx.config.remove_hetero.matches(&name) =>
            {
                Some(residue)
            }
            _ => None,
        })
        .collect();
    if doomed.is_empty() {
        return StageOutcome::unchanged();
    }
    info!(residues = doomed.len(), "Removing heteroatom residues.");
    StageOutcome::changed(remove_residues(structure, &doomed))
}

pub fn remove_hydrogens(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    let model = structure.primary_model();
    let count = model
        .residues()
        .map(|(_, r)| r.atoms().iter().filter(|a| a.is_hydrogen()).count())
        .sum::<usize>();
    if !ctx.config.remove_hydrogens || count == 0 {
        return StageOutcome::unchanged();
    }
    info!(atoms = count, "Removing hydrogens.");
    let primary = model.index;
    StageOutcome::changed(structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for chain in model.chains_mut() {
            for residue in chain.residues_mut() {
                residue.atoms_mut().retain(|a| !a.is_hydrogen());
            }
        }
    }))
}

pub fn remove_water(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.remove_water {
        return StageOutcome::unchanged();
    }
    let doomed: BTreeSet<ResidueKey> = structure
        .primary_model()
        .residues()
        .filter(|(_, r)| r.class == ResidueClass::Water)
        .map(|(c, r)| r.key(&c.id))
        .collect();
    if doomed.is_empty() {
        return StageOutcome::unchanged();
    }
    info!(residues = doomed.len(), "Removing water.");
    StageOutcome::changed(remove_residues(structure, &doomed))
}
