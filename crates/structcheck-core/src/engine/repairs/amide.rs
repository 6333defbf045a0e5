use super::{RepairContext, StageOutcome};
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::AmideGroup;
use crate::engine::checks::amide::assess;
use tracing::debug;

/// Exchanges the coordinates of the amide oxygen and nitrogen, keeping atom names.
pub(crate) fn swap_amide(residue: &mut Residue, amide: &AmideGroup) -> bool {
    let (Some(o), Some(n)) = (
        residue.atom(&amide.oxygen).map(|a| a.position),
        residue.atom(&amide.nitrogen).map(|a| a.position),
    ) else {
        return false;
    };
    for atom in residue.atoms_mut() {
        if atom.name == amide.oxygen {
            atom.position = n;
        } else if atom.name == amide.nitrogen {
            atom.position = o;
        }
    }
    true
}

pub fn fix(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.fix_amides {
        return StageOutcome::unchanged();
    }
    let analysis = ctx.analyze(structure);
    let mut flips: Vec<ResidueKey> = Vec::new();
    for (c, chain) in analysis.model.chains().iter().enumerate() {
        for (r, residue) in chain.residues().iter().enumerate() {
            if assess(&analysis, c, r).is_some_and(|a| a.swap_recommended()) {
                flips.push(residue.key(&chain.id));
            }
        }
    }
    if flips.is_empty() {
        return StageOutcome::unchanged();
    }
    debug!(residues = ?flips, "Swapping amide assignments.");
    let registry = ctx.registry;
    let primary = structure.primary_model().index;
    StageOutcome::changed(structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for key in &flips {
            let Some(residue) = model.find_residue_mut(key) else {
                continue;
            };
            if let Some(amide) = registry.get(&residue.name).and_then(|t| t.amide.clone()) {
                swap_amide(residue, &amide);
            }
        }
    }))
}
