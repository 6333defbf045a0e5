use crate::core::models::chain::Chain;
use crate::core::models::residue::{Residue, ResidueClass};
use crate::core::topology::registry::{BACKBONE_ATOMS, TERMINAL_OXYGEN};
use crate::engine::context::CheckContext;
use crate::engine::findings::{Finding, GapKind};

/// Missing side-chain heavy atoms of every amino acid with a template.
pub fn run_sidechains(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (chain, residue) in ctx.model.residues() {
        let Some(template) = ctx.registry.get(&residue.name) else {
            continue;
        };
        let present = residue.heavy_atom_names();
        let missing: Vec<String> = template
            .sidechain
            .iter()
            .filter(|name| !present.contains(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            findings.push(Finding::MissingSidechainAtoms {
                residue: residue.key(&chain.id),
                residue_name: residue.name.clone(),
                missing,
            });
        }
    }
    findings
}

fn amino_acids(chain: &Chain) -> impl Iterator<Item = &Residue> {
    chain
        .residues()
        .iter()
        .filter(|r| r.class == ResidueClass::AminoAcid)
}

/// Missing backbone atoms (OXT on the last amino acid of each chain) and gaps between
/// consecutive amino acids: numbering jumps and over-long C-N distances.
pub fn run_backbone(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for chain in ctx.model.chains() {
        let residues: Vec<&Residue> = amino_acids(chain).collect();
        for (i, residue) in residues.iter().enumerate() {
            let present = residue.heavy_atom_names();
            let terminal = (i + 1 == residues.len()).then_some(TERMINAL_OXYGEN);
            let missing: Vec<String> = BACKBONE_ATOMS
                .iter()
                .copied()
                .chain(terminal)
                .filter(|name| !present.contains(name))
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                findings.push(Finding::MissingBackboneAtoms {
                    residue: residue.key(&chain.id),
                    residue_name: residue.name.clone(),
                    missing,
                });
            }
        }
        for pair in residues.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let distance = match (prev.atom("C"), next.atom("N")) {
                (Some(c), Some(n)) => Some(c.distance(n)),
                _ => None,
            };
            let kind = if next.number - prev.number > 1 {
                GapKind::Numbering
            } else if distance.is_some_and(|d| d > ctx.config.peptide_bond_max) {
                GapKind::ChainBreak
            } else {
                continue;
            };
            findings.push(Finding::BackboneGap {
                after: prev.key(&chain.id),
                before: next.key(&chain.id),
                kind,
                distance,
            });
        }
    }
    findings
}

/// Polymer-record residues the topology reference does not know.
pub fn run_unknown(ctx: &CheckContext) -> Vec<Finding> {
    ctx.model
        .residues()
        .filter(|(_, residue)| residue.class == ResidueClass::Unknown)
        .map(|(chain, residue)| Finding::UnknownResidue {
            residue: residue.key(&chain.id),
            residue_name: residue.name.clone(),
        })
        .collect()
}
