use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::{ResidueTemplate, Stereocenter};
use crate::core::utils::geometry::{angle, dihedral, place_atom};
use crate::engine::checks::chirality;
use crate::engine::findings::{Finding, NoteKind, RepairNote};
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Inverts one stereocenter in place.
///
/// The two `swap` substituents exchange bond directions, each keeping its own bond length.
/// Atoms built from a moved atom are then re-placed in template build order, keeping the
/// internal coordinates they had before the inversion. Returns `false`, leaving the residue
/// untouched, when the center or a swapped substituent is absent.
pub(crate) fn invert_center(residue: &mut Residue, template: &ResidueTemplate, center: &Stereocenter) -> bool {
    let before: HashMap<String, Point3<f64>> = residue
        .atoms()
        .iter()
        .map(|a| (a.name.clone(), a.position))
        .collect();
    let [first, second] = &center.swap;
    let (Some(&pivot), Some(&p1), Some(&p2)) = (
        before.get(&center.center),
        before.get(first),
        before.get(second),
    ) else {
        return false;
    };
    let (d1, d2) = (p1 - pivot, p2 - pivot);
    let mut after = before.clone();
    after.insert(first.clone(), pivot + d2.normalize() * d1.norm());
    after.insert(second.clone(), pivot + d1.normalize() * d2.norm());

    let mut moved: HashSet<&str> = HashSet::from([first.as_str(), second.as_str()]);
    for ic in &template.build {
        if moved.contains(ic.atom.as_str()) || !ic.from.iter().any(|f| moved.contains(f.as_str())) {
            continue;
        }
        let lookup = |table: &HashMap<String, Point3<f64>>, name: &str| table.get(name).copied();
        let [a, b, c] = &ic.from;
        let (Some(old), Some(oa), Some(ob), Some(oc)) = (
            lookup(&before, &ic.atom),
            lookup(&before, a),
            lookup(&before, b),
            lookup(&before, c),
        ) else {
            continue;
        };
        let (Some(na), Some(nb), Some(nc)) = (lookup(&after, a), lookup(&after, b), lookup(&after, c)) else {
            continue;
        };
        let bond = nalgebra::distance(&oc, &old);
        if let Some(placed) = place_atom(&na, &nb, &nc, bond, angle(&ob, &oc, &old), dihedral(&oa, &ob, &oc, &old)) {
            after.insert(ic.atom.clone(), placed);
            moved.insert(ic.atom.as_str());
        }
    }

    for atom in residue.atoms_mut() {
        if let Some(position) = after.get(&atom.name) {
            atom.position = *position;
        }
    }
    true
}

pub fn fix(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.fix_chirality {
        return StageOutcome::unchanged();
    }
    let violations = chirality::run(&ctx.analyze(structure));
    if violations.is_empty() {
        return StageOutcome::unchanged();
    }
    let model = structure.primary_model();
    let mut inverted: BTreeMap<ResidueKey, Residue> = BTreeMap::new();
    let mut notes = Vec::new();
    for finding in &violations {
        let Finding::ChiralityViolation { residue: key, center, .. } = finding else {
            continue;
        };
        let Some(original) = inverted.get(key).cloned().or_else(|| model.find_residue(key).cloned()) else {
            continue;
        };
        let Some(template) = ctx.registry.get(&original.name) else {
            continue;
        };
        let Some(stereocenter) = template.stereocenters.iter().find(|s| &s.center == center) else {
            continue;
        };
        let mut residue = original;
        if invert_center(&mut residue, template, stereocenter) {
            debug!(residue = %key, %center, "Inverted stereocenter.");
            inverted.insert(key.clone(), residue);
        } else {
            notes.push(
                RepairNote::new(
                    RepairStage::ChiralityFix.name(),
                    NoteKind::Unresolved,
                    format!("cannot invert {center}: substituent atoms missing"),
                )
                .at(key.clone()),
            );
        }
    }
    if inverted.is_empty() {
        return StageOutcome::unchanged().with_notes(notes);
    }
    info!(residues = inverted.len(), "Corrected inverted stereocenters.");
    let primary = model.index;
    let revised = structure.rebuild(|model| {
        if model.index != primary {
            return;
        }
        for (key, residue) in &inverted {
            if let Some(slot) = model.find_residue_mut(key) {
                *slot = residue.clone();
            }
        }
    });
    StageOutcome::changed(revised).with_notes(notes)
}
