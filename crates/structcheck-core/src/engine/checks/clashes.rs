use crate::core::models::residue::ResidueClass;
use crate::core::topology::chemistry::AtomChemistry;
use crate::engine::config::ClashThresholds;
use crate::engine::context::CheckContext;
use crate::engine::findings::{ClashCategory, ClashPair, Finding};
use tracing::{debug, instrument};

/// Category a close pair of these two atom types falls into and the distance below which it
/// counts as a clash. Complementary pairs (opposite charges, donor with acceptor) and
/// polar/apolar mixtures have no category of their own.
fn contact_rule(a: &AtomChemistry, b: &AtomChemistry, t: &ClashThresholds) -> Option<(ClashCategory, f64)> {
    if a.charge != 0 && b.charge != 0 {
        return match (a.is_positive(), b.is_positive()) {
            (true, true) => Some((ClashCategory::Positive, t.ionic)),
            (false, false) => Some((ClashCategory::Negative, t.ionic)),
            _ => None,
        };
    }
    if a.is_donor_only() && b.is_donor_only() {
        Some((ClashCategory::PolarDonor, t.polar))
    } else if a.is_acceptor_only() && b.is_acceptor_only() {
        Some((ClashCategory::PolarAcceptor, t.polar))
    } else if a.is_apolar() && b.is_apolar() {
        Some((ClashCategory::Apolar, t.apolar))
    } else {
        None
    }
}

/// Clash category of a non-bonded pair at `distance`, if it clashes at all.
///
/// Severe overrides everything; otherwise charge categories win over polar ones, which win
/// over apolar.
pub(crate) fn classify(
    a: &AtomChemistry,
    b: &AtomChemistry,
    distance: f64,
    thresholds: &ClashThresholds,
) -> Option<ClashCategory> {
    if distance < thresholds.severe {
        return Some(ClashCategory::Severe);
    }
    contact_rule(a, b, thresholds)
        .filter(|&(_, limit)| distance < limit)
        .map(|(category, _)| category)
}

/// Closest acceptable approach of two atom types.
pub(crate) fn contact_distance(a: &AtomChemistry, b: &AtomChemistry, thresholds: &ClashThresholds) -> f64 {
    contact_rule(a, b, thresholds).map_or(thresholds.severe, |(_, limit)| limit)
}

/// Whether atom `i` takes part in contact analysis at all.
pub(crate) fn is_contact_atom(ctx: &CheckContext, i: usize) -> bool {
    !ctx.atom(i).is_hydrogen()
        && (ctx.config.include_water_clashes || ctx.residue(i).class != ResidueClass::Water)
}

#[instrument(skip_all, name = "clash_check")]
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let thresholds = &ctx.config.clashes;
    let findings: Vec<Finding> = ctx
        .index
        .pairs_within(thresholds.cutoff)
        .into_iter()
        .filter(|&(i, j, _)| {
            is_contact_atom(ctx, i)
                && is_contact_atom(ctx, j)
                && !ctx.connectivity.is_excluded(i, j)
                && ctx.atom(i).shares_conformer_with(ctx.atom(j))
        })
        .filter_map(|(i, j, distance)| {
            let category = if ctx.connectivity.is_vicinal(i, j) {
                // 1-4 pairs sit inside contact distances by construction.
                (distance < thresholds.severe).then_some(ClashCategory::Severe)?
            } else {
                classify(&ctx.chemistry[i], &ctx.chemistry[j], distance, thresholds)?
            };
            Some(Finding::Clash(ClashPair {
                first: ctx.atom_key(i),
                second: ctx.atom_key(j),
                distance,
                category,
            }))
        })
        .collect();
    debug!(clashes = findings.len(), "Clash enumeration complete.");
    findings
}
