use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::atom::Atom;
use crate::core::models::chain::Chain;
use crate::core::models::residue::ResidueClass;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::TERMINAL_OXYGEN;
use crate::core::utils::geometry::{place_atom, sp2_third_position};
use crate::engine::checks::completeness;
use crate::engine::collaborators::{ModelingRequest, invoke_with_timeout};
use crate::engine::findings::{NoteKind, RepairNote};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CARBONYL_BOND: f64 = 1.23;
const CARBOXYLATE_BOND: f64 = 1.25;
const CARBONYL_ANGLE: f64 = 120.5;

fn backbone_rank(name: &str) -> usize {
    match name {
        "N" => 0,
        "CA" => 1,
        "C" => 2,
        "O" => 3,
        TERMINAL_OXYGEN => 5,
        _ => 4,
    }
}

/// Places missing carbonyl oxygens and the terminal OXT of one chain from the local
/// geometry. Returns the number of atoms added.
fn place_carbonyls(chain: &mut Chain, peptide_bond_max: f64) -> usize {
    let amino: Vec<usize> = chain
        .residues()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.class == ResidueClass::AminoAcid)
        .map(|(i, _)| i)
        .collect();
    let mut added = 0;
    for (k, &i) in amino.iter().enumerate() {
        let residues = chain.residues();
        let residue = &residues[i];
        let position = |name: &str| residue.atom(name).map(|a| a.position);
        let (Some(n), Some(ca), Some(c)) = (position("N"), position("CA"), position("C")) else {
            continue;
        };
        let next_n = amino
            .get(k + 1)
            .map(|&j| &residues[j])
            .filter(|next| next.number - residue.number == 1)
            .and_then(|next| next.atom("N"))
            .map(|a| a.position)
            .filter(|p| nalgebra::distance(&c, p) <= peptide_bond_max);
        let hetero = residue.atom("C").is_some_and(|a| a.is_hetero);

        let mut placed = Vec::new();
        let o = match position("O") {
            Some(o) => Some(o),
            None => {
                let o = match (next_n, position(TERMINAL_OXYGEN)) {
                    (Some(next), _) => sp2_third_position(&c, &ca, &next, CARBONYL_BOND),
                    (None, Some(oxt)) => sp2_third_position(&c, &ca, &oxt, CARBONYL_BOND),
                    (None, None) => place_atom(&n, &ca, &c, CARBONYL_BOND, CARBONYL_ANGLE, 180.0),
                };
                placed.extend(o.map(|p| Atom::new("O", "O", p)));
                o
            }
        };
        if k + 1 == amino.len() && position(TERMINAL_OXYGEN).is_none() {
            if let Some(o) = o {
                placed.extend(
                    sp2_third_position(&c, &ca, &o, CARBOXYLATE_BOND).map(|p| Atom::new(TERMINAL_OXYGEN, "O", p)),
                );
            }
        }
        if placed.is_empty() {
            continue;
        }
        added += placed.len();
        let residue = &mut chain.residues_mut()[i];
        for mut atom in placed {
            atom.is_hetero = hetero;
            residue.push_atom(atom);
        }
        residue.atoms_mut().sort_by_key(|a| backbone_rank(&a.name));
    }
    added
}

/// Completes carbonyl and terminal oxygens locally, then hands remaining backbone findings
/// to the homology modeler together with the canonical sequence.
pub fn complete(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.complete_backbone {
        return StageOutcome::unchanged();
    }
    let stage = RepairStage::BackboneCompletion.name();
    if completeness::run_backbone(&ctx.analyze(structure)).is_empty() {
        return StageOutcome::unchanged();
    }

    let primary = structure.primary_model().index;
    let mut chains = structure.primary_model().chains().to_vec();
    let added: usize = chains
        .iter_mut()
        .map(|chain| place_carbonyls(chain, ctx.checks.peptide_bond_max))
        .sum();
    let local = (added > 0).then(|| {
        debug!(atoms = added, "Placed backbone oxygens.");
        structure.rebuild(|model| {
            if model.index == primary {
                *model.chains_mut() = chains.clone();
            }
        })
    });
    let current = local.as_ref().unwrap_or(structure);

    let remaining = completeness::run_backbone(&ctx.analyze(current));
    if remaining.is_empty() {
        return match local {
            Some(revised) => StageOutcome::changed(revised),
            None => StageOutcome::unchanged(),
        };
    }

    let sequence = match ctx
        .collaborators
        .sequences
        .canonical_sequence(current.metadata().entry_id.as_deref())
    {
        Ok(sequence) => sequence,
        Err(e) => {
            warn!(error = %e, "Canonical sequence unavailable.");
            None
        }
    };
    let request = ModelingRequest {
        structure: current.clone(),
        sequence,
        gaps: remaining.clone(),
        license: ctx.config.collaborators.license.clone(),
    };
    let modeler = Arc::clone(&ctx.collaborators.modeler);
    info!(gaps = remaining.len(), "Requesting backbone modeling.");
    match invoke_with_timeout(ctx.config.collaborators.modeling_timeout, move |cancel| {
        modeler.rebuild_backbone(request, cancel)
    }) {
        Ok(modeled) => {
            let revised = modeled
                .with_disulfides(current.disulfides().to_vec())
                .with_revision(structure.revision() + 1);
            StageOutcome::changed(revised)
        }
        Err(e) => {
            warn!(error = %e, gaps = remaining.len(), "Backbone modeling failed; gaps left open.");
            let notes = remaining
                .iter()
                .map(|gap| {
                    let note = RepairNote::new(stage, NoteKind::CollaboratorUnavailable, format!("{}: {e}", gap.type_name()));
                    match gap.residue() {
                        Some(key) => note.at(key.clone()),
                        None => note,
                    }
                })
                .collect();
            let outcome = match local {
                Some(revised) => StageOutcome::changed(revised),
                None => StageOutcome::unchanged(),
            };
            outcome.with_notes(notes)
        }
    }
}
