use crate::core::topology::chemistry::AtomChemistry;
use crate::core::utils::geometry::angle;
use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;
use tracing::trace;

/// Hydrogen-bond consistency of one terminal amide in its current and swapped assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AmideAssessment {
    pub current: i32,
    pub swapped: i32,
    /// Whether any partner had a preference at all.
    pub evidence: bool,
}

impl AmideAssessment {
    pub fn swap_recommended(&self) -> bool {
        self.swapped > self.current
    }

    pub fn is_ambiguous(&self) -> bool {
        self.swapped == self.current && self.evidence
    }
}

/// How well a partner suits an amide oxygen: donors and cations favor it, acceptors and
/// anions disfavor it. The nitrogen preference is the negation.
fn oxygen_preference(partner: &AtomChemistry) -> i32 {
    if partner.is_positive() || partner.is_donor_only() {
        1
    } else if partner.is_negative() || partner.is_acceptor_only() {
        -1
    } else {
        0
    }
}

/// Sum of oxygen preferences of the polar partners around the atom at `position`.
fn environment(ctx: &CheckContext, carbon: usize, position: usize) -> (i32, bool) {
    let criteria = &ctx.config.amide;
    let mut score = 0;
    let mut evidence = false;
    for (partner, _) in ctx.index.neighbors_of(position, criteria.contact_distance) {
        if ctx.same_residue(partner, position)
            || ctx.atom(partner).is_hydrogen()
            || ctx.connectivity.is_excluded(partner, position)
            || ctx.connectivity.is_vicinal(partner, position)
            || !ctx.atom(partner).shares_conformer_with(ctx.atom(position))
        {
            continue;
        }
        let theta = angle(&ctx.positions[carbon], &ctx.positions[position], &ctx.positions[partner]);
        if theta < criteria.min_angle {
            continue;
        }
        let preference = oxygen_preference(&ctx.chemistry[partner]);
        evidence |= preference != 0;
        score += preference;
    }
    (score, evidence)
}

/// Scores the amide group of residue `residue` in chain `chain`, when it has one and all
/// three atoms are present.
pub(crate) fn assess(ctx: &CheckContext, chain: usize, residue: usize) -> Option<AmideAssessment> {
    let template = ctx.registry.get(&ctx.model.chains()[chain].residues()[residue].name)?;
    let amide = template.amide.as_ref()?;
    let find = |name: &str| ctx.residue_atoms(chain, residue).find(|&i| ctx.atom(i).name == name);
    let (carbon, oxygen, nitrogen) = (find(&amide.carbon)?, find(&amide.oxygen)?, find(&amide.nitrogen)?);

    let (at_oxygen, seen_o) = environment(ctx, carbon, oxygen);
    let (at_nitrogen, seen_n) = environment(ctx, carbon, nitrogen);
    Some(AmideAssessment {
        current: at_oxygen - at_nitrogen,
        swapped: at_nitrogen - at_oxygen,
        evidence: seen_o || seen_n,
    })
}

pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (c, chain) in ctx.model.chains().iter().enumerate() {
        for (r, residue) in chain.residues().iter().enumerate() {
            let Some(assessment) = assess(ctx, c, r) else {
                continue;
            };
            trace!(residue = %residue.key(&chain.id), ?assessment, "Amide environment.");
            if assessment.swap_recommended() || assessment.is_ambiguous() {
                findings.push(Finding::AmideAmbiguity {
                    residue: residue.key(&chain.id),
                    residue_name: residue.name.clone(),
                    current_score: assessment.current,
                    swapped_score: assessment.swapped,
                    swap_recommended: assessment.swap_recommended(),
                });
            }
        }
    }
    findings
}
