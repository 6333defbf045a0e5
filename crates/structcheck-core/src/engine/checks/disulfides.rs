use crate::core::models::ids::ResidueKey;
use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;
use std::collections::BTreeMap;
use tracing::debug;

pub(crate) const SULFUR: &str = "SG";

/// Flat indices of cysteine sulfur atoms (any CYS alias) in the primary model.
pub(crate) fn cysteine_sulfurs(ctx: &CheckContext) -> Vec<usize> {
    (0..ctx.sites.len())
        .filter(|&i| {
            ctx.atom(i).name == SULFUR && ctx.registry.canonical_name(&ctx.residue(i).name) == Some("CYS")
        })
        .collect()
}

/// Emits one candidate per SG pair within the disulfide cutoff, then flags cysteines taking
/// part in zero or several candidates.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let cutoff = ctx.config.disulfide_cutoff;
    let sulfurs = cysteine_sulfurs(ctx);
    let mut partners: BTreeMap<ResidueKey, usize> =
        sulfurs.iter().map(|&i| (ctx.residue_key(i), 0)).collect();

    let mut candidates = Vec::new();
    for &i in &sulfurs {
        for (j, distance) in ctx.index.neighbors_of(i, cutoff) {
            if j <= i || ctx.atom(j).name != SULFUR || ctx.same_residue(i, j) {
                continue;
            }
            if !partners.contains_key(&ctx.residue_key(j)) || !ctx.atom(i).shares_conformer_with(ctx.atom(j)) {
                continue;
            }
            let (a, b) = (ctx.residue_key(i), ctx.residue_key(j));
            let (first, second) = if a <= b { (a, b) } else { (b, a) };
            debug!(%first, %second, distance, "Disulfide candidate.");
            candidates.push((first, second, distance));
        }
    }
    candidates.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));
    candidates.dedup_by(|x, y| x.0 == y.0 && x.1 == y.1);

    for (first, second, _) in &candidates {
        for key in [first, second] {
            if let Some(count) = partners.get_mut(key) {
                *count += 1;
            }
        }
    }

    let mut findings: Vec<Finding> = candidates
        .into_iter()
        .map(|(first, second, distance)| Finding::DisulfideCandidate {
            first,
            second,
            distance,
        })
        .collect();
    findings.extend(
        partners
            .into_iter()
            .filter(|&(_, count)| count != 1)
            .map(|(residue, candidates)| Finding::AmbiguousCysteine { residue, candidates }),
    );
    findings
}
