use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::atom::{Atom, infer_element};
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::ResidueTemplate;
use crate::core::utils::geometry::place_atom;
use crate::engine::checks::completeness;
use crate::engine::findings::{Finding, NoteKind, RepairNote};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum PlacementError {
    #[error("reference atom {anchor} needed for {atom} is missing")]
    MissingAnchor { atom: String, anchor: String },
    #[error("reference atoms for {0} are collinear")]
    Degenerate(String),
    #[error("no build recipe for {0}")]
    NoRecipe(String),
}

/// Adds every missing side-chain heavy atom of `residue` from the template's internal
/// coordinates. Atoms are placed in build order, so later atoms may anchor on earlier ones.
/// On success the atoms are reordered to template order and the placed names are returned.
pub(crate) fn build_missing(residue: &mut Residue, template: &ResidueTemplate) -> Result<Vec<String>, PlacementError> {
    let present = residue.heavy_atom_names();
    let missing: Vec<&String> = template
        .sidechain
        .iter()
        .filter(|name| !present.contains(name.as_str()))
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(name) = missing.iter().find(|name| template.recipe(name).is_none()) {
        return Err(PlacementError::NoRecipe((*name).clone()));
    }

    let hetero = residue.atom("CA").is_some_and(|a| a.is_hetero);
    let mut positions: HashMap<String, _> = residue
        .atoms()
        .iter()
        .filter(|a| !a.is_hydrogen())
        .map(|a| (a.name.clone(), a.position))
        .collect();
    let mut placed = Vec::new();
    for ic in template.build.iter().filter(|ic| missing.contains(&&ic.atom)) {
        let anchor = |name: &String| {
            positions.get(name).copied().ok_or_else(|| PlacementError::MissingAnchor {
                atom: ic.atom.clone(),
                anchor: name.clone(),
            })
        };
        let [a, b, c] = &ic.from;
        let (a, b, c) = (anchor(a)?, anchor(b)?, anchor(c)?);
        let position = place_atom(&a, &b, &c, ic.bond, ic.angle, ic.torsion)
            .ok_or_else(|| PlacementError::Degenerate(ic.atom.clone()))?;
        positions.insert(ic.atom.clone(), position);
        let mut atom = Atom::new(&ic.atom, &infer_element(&ic.atom, &residue.name), position);
        atom.is_hetero = hetero;
        placed.push(atom);
    }

    let names: Vec<String> = placed.iter().map(|a| a.name.clone()).collect();
    residue.atoms_mut().extend(placed);
    let order: HashMap<&str, usize> = template
        .canonical_atoms()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();
    residue
        .atoms_mut()
        .sort_by_key(|a| order.get(a.name.as_str()).copied().unwrap_or(usize::MAX));
    Ok(names)
}

pub fn complete(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.complete_sidechains {
        return StageOutcome::unchanged();
    }
    let stage = RepairStage::SidechainCompletion.name();
    let analysis = ctx.analyze(structure);
    let mut notes: Vec<RepairNote> = completeness::run_unknown(&analysis)
        .into_iter()
        .filter_map(|f| match f {
            Finding::UnknownResidue { residue, residue_name } => Some(
                RepairNote::new(stage, NoteKind::UnknownResidue, format!("no template for {residue_name}"))
                    .at(residue),
            ),
            _ => None,
        })
        .collect();

    let mut completed: BTreeMap<ResidueKey, Residue> = BTreeMap::new();
    for finding in completeness::run_sidechains(&analysis) {
        let Finding::MissingSidechainAtoms { residue: key, .. } = finding else {
            continue;
        };
        let (Some(original), Some(template)) = (
            analysis.model.find_residue(&key),
            analysis.model.find_residue(&key).and_then(|r| ctx.registry.get(&r.name)),
        ) else {
            continue;
        };
        let mut residue = original.clone();
        match build_missing(&mut residue, template) {
            Ok(placed) => {
                debug!(residue = %key, atoms = ?placed, "Completed side chain.");
                completed.insert(key, residue);
            }
            Err(e) => notes.push(RepairNote::new(stage, NoteKind::Unresolved, e.to_string()).at(key)),
        }
    }
    if completed.is_empty() {
        return StageOutcome::unchanged().with_notes(notes);
    }
    info!(residues = completed.len(), "Completed side chains.");
    let primary = structure.primary_model().index;
    let revised = structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for (key, residue) in &completed {
            if let Some(slot) = model.find_residue_mut(key) {
                *slot = residue.clone();
            }
        }
    });
    StageOutcome::changed(revised).with_notes(notes)
}
