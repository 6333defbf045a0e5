use super::{RepairContext, RepairStage, StageOutcome};
use crate::core::models::ids::ResidueKey;
use crate::core::models::structure::{DisulfideLink, Structure};
use crate::engine::checks::disulfides;
use crate::engine::findings::{Finding, NoteKind, RepairNote};
use std::collections::BTreeSet;
use tracing::info;

/// Residue name given to cysteines taking part in an accepted disulfide bridge.
pub const BRIDGED_CYSTEINE: &str = "CYX";

/// Accepts every unambiguous disulfide candidate: both cysteines are renamed to
/// [`BRIDGED_CYSTEINE`] and the pair is recorded as a bonded relation.
pub fn mark(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.accept_disulfides {
        return StageOutcome::unchanged();
    }
    let findings = disulfides::run(&ctx.analyze(structure));
    let contested: BTreeSet<&ResidueKey> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::AmbiguousCysteine { residue, candidates } if *candidates > 1 => Some(residue),
            _ => None,
        })
        .collect();

    let notes: Vec<RepairNote> = contested
        .iter()
        .map(|&residue| {
            RepairNote::new(
                RepairStage::DisulfideMarking.name(),
                NoteKind::Unresolved,
                "sulfur has several disulfide partners; no bridge accepted",
            )
            .at(residue.clone())
        })
        .collect();

    let accepted: Vec<DisulfideLink> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::DisulfideCandidate { first, second, .. }
                if !contested.contains(first) && !contested.contains(second) =>
            {
                Some(DisulfideLink::new(first.clone(), second.clone()))
            }
            _ => None,
        })
        .collect();

    let model = structure.primary_model();
    let pending = accepted.iter().any(|link| {
        !structure.disulfides().contains(link)
            || [&link.first, &link.second]
                .iter()
                .any(|key| model.find_residue(key).is_some_and(|r| r.name != BRIDGED_CYSTEINE))
    });
    if !pending {
        return StageOutcome::unchanged().with_notes(notes);
    }

    info!(bridges = accepted.len(), "Marking disulfide bridges.");
    let primary = model.index;
    let mut links = structure.disulfides().to_vec();
    links.extend(accepted.iter().cloned());
    let revised = structure
        .rebuild(|model| {
            if model.index != primary {
                return;
            }
            for link in &accepted {
                for key in [&link.first, &link.second] {
                    if let Some(residue) = model.find_residue_mut(key) {
                        residue.name = BRIDGED_CYSTEINE.to_string();
                    }
                }
            }
        })
        .with_disulfides(links);
    StageOutcome::changed(revised).with_notes(notes)
}
