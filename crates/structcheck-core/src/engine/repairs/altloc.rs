use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::engine::config::AltlocChoice;
use crate::engine::findings::{NoteKind, RepairNote};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

const TIE_TOLERANCE: f64 = 1e-6;

/// Label to keep in `residue` and whether the choice was an unresolved tie.
fn choose_label(residue: &Residue, choice: AltlocChoice) -> Option<(char, bool)> {
    let mut occupancies: BTreeMap<char, (f64, usize)> = BTreeMap::new();
    for atom in residue.atoms() {
        if let Some(label) = atom.altloc {
            let entry = occupancies.entry(label).or_insert((0.0, 0));
            entry.0 += atom.occupancy;
            entry.1 += 1;
        }
    }
    if occupancies.is_empty() {
        return None;
    }
    if let AltlocChoice::Label(wanted) = choice {
        if occupancies.contains_key(&wanted) {
            return Some((wanted, false));
        }
    }
    let means: Vec<(char, f64)> = occupancies
        .into_iter()
        .map(|(label, (sum, n))| (label, sum / n as f64))
        .collect();
    let best = means.iter().map(|&(_, mean)| mean).fold(f64::NEG_INFINITY, f64::max);
    // Labels iterate in order, so the first one at the maximum is the lexicographic choice.
    let leaders: Vec<char> = means
        .iter()
        .filter(|&&(_, mean)| best - mean <= TIE_TOLERANCE)
        .map(|&(label, _)| label)
        .collect();
    Some((leaders[0], leaders.len() > 1))
}

/// Keeps one conformer per residue: the chosen label's atoms lose their label and become
/// fully occupied, other labelled copies are dropped.
pub(crate) fn collapse(residue: &mut Residue, label: char) {
    let atoms = residue.atoms_mut();
    atoms.retain(|a| a.altloc.map_or(true, |l| l == label));
    let mut seen = HashSet::new();
    atoms.retain(|a| seen.insert(a.name.clone()));
    for atom in atoms.iter_mut().filter(|a| a.altloc.is_some()) {
        atom.altloc = None;
        atom.occupancy = 1.0;
    }
}

pub fn resolve(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    let stage = RepairStage::AltlocResolution.name();
    let model = structure.primary_model();
    let mut decisions = Vec::new();
    let mut notes = Vec::new();
    for (chain, residue) in model.residues() {
        let Some((label, tied)) = choose_label(residue, ctx.config.altloc) else {
            continue;
        };
        let key = residue.key(&chain.id);
        if tied {
            warn!(residue = %key, %label, "Equal alternate-location occupancies; keeping the first label.");
            notes.push(
                RepairNote::new(
                    stage,
                    NoteKind::AmbiguousAltloc,
                    format!("equal occupancy for several labels; kept '{label}'"),
                )
                .at(key.clone()),
            );
        }
        debug!(residue = %key, %label, "Resolved alternate locations.");
        decisions.push((key, label));
    }
    if decisions.is_empty() {
        return StageOutcome::unchanged();
    }
    let primary = model.index;
    let revised = structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for (key, label) in &decisions {
            if let Some(residue) = model.find_residue_mut(key) {
                collapse(residue, *label);
            }
        }
    });
    StageOutcome::changed(revised).with_notes(notes)
}
