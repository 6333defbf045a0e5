use super::{RepairContext, StageOutcome};
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::Residue;
use crate::core::models::structure::{DisulfideLink, Structure};
use crate::core::topology::registry::TopologyRegistry;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{info, warn};

const CHAIN_LABELS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn chain_label(index: usize) -> String {
    CHAIN_LABELS
        .chars()
        .nth(index)
        .map_or_else(|| index.to_string(), String::from)
}

fn is_contiguous(prev: &Residue, next: &Residue, peptide_bond_max: f64) -> bool {
    if next.number - prev.number > 1 {
        return false;
    }
    match (prev.atom("C"), next.atom("N")) {
        (Some(c), Some(n)) => c.distance(n) <= peptide_bond_max,
        _ => true,
    }
}

fn fragments(residues: &[&Residue], peptide_bond_max: f64) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..residues.len() {
        if !is_contiguous(residues[i - 1], residues[i], peptide_bond_max) {
            ranges.push(start..i);
            start = i;
        }
    }
    if !residues.is_empty() {
        ranges.push(start..residues.len());
    }
    ranges
}

/// New numbers for the polymer residues of one chain.
///
/// Each contiguous fragment is located in the canonical sequence, searching forward from the
/// end of the previous match. Fragments that cannot be located continue from the previous
/// fragment, keeping the size of the original numbering gap; the first one starts at 1.
fn number_polymer(
    residues: &[&Residue],
    sequence: Option<&str>,
    registry: &TopologyRegistry,
    peptide_bond_max: f64,
) -> Vec<isize> {
    let mut numbers: Vec<isize> = Vec::with_capacity(residues.len());
    let mut cursor = 0usize;
    for range in fragments(residues, peptide_bond_max) {
        let letters: String = residues[range.clone()]
            .iter()
            .map(|r| registry.one_letter(&r.name).unwrap_or('X'))
            .collect();
        let last = numbers.last().copied();
        let located = sequence
            .and_then(|seq| seq.get(cursor..)?.find(&letters))
            .map(|offset| cursor + offset)
            .filter(|&at| last.map_or(true, |l| at as isize + 1 > l));
        let start = match (located, last) {
            (Some(at), _) => {
                cursor = at + letters.len();
                at as isize + 1
            }
            (None, None) => 1,
            (None, Some(l)) => l + (residues[range.start].number - residues[range.start - 1].number).max(1),
        };
        numbers.extend((0..range.len()).map(|k| start + k as isize));
    }
    numbers
}

/// Relabels chains `A`, `B`, ... in order and renumbers residues from the canonical
/// sequence when available. Numbers strictly increase along each chain: a non-polymer
/// residue takes the number after its predecessor and pushes later polymer numbers up if
/// needed. Insertion codes are cleared.
pub fn renumber(structure: &Structure, ctx: &RepairContext) -> StageOutcome {
    if !ctx.config.renumber {
        return StageOutcome::unchanged();
    }
    let model = structure.primary_model();
    let sequence = match ctx
        .collaborators
        .sequences
        .canonical_sequence(structure.metadata().entry_id.as_deref())
    {
        Ok(sequence) => sequence,
        Err(e) => {
            warn!(error = %e, "Canonical sequence unavailable; numbering sequentially.");
            None
        }
    };

    let mut renamed = BTreeMap::new();
    let mut plan: Vec<(String, Vec<isize>)> = Vec::with_capacity(model.chains().len());
    for (c, chain) in model.chains().iter().enumerate() {
        let id = chain_label(c);
        let polymer: Vec<&Residue> = chain.residues().iter().filter(|r| r.class.is_polymer()).collect();
        let polymer_numbers = number_polymer(
            &polymer,
            sequence.as_ref().and_then(|s| s.for_chain(&chain.id)),
            ctx.registry,
            ctx.checks.peptide_bond_max,
        );
        let mut polymer_numbers = polymer_numbers.into_iter();
        let mut shift = 0;
        let mut numbers: Vec<isize> = Vec::with_capacity(chain.residues().len());
        for residue in chain.residues() {
            let previous = numbers.last().copied();
            let next = previous.map_or(1, |p| p + 1);
            let aligned = if residue.class.is_polymer() { polymer_numbers.next() } else { None };
            let number = match aligned {
                Some(aligned) => {
                    // Keep the chain strictly increasing past interleaved non-polymers.
                    shift += (next - (aligned + shift)).max(0);
                    aligned + shift
                }
                None => next,
            };
            let old = residue.key(&chain.id);
            let new = ResidueKey::new(&id, number, None);
            if old != new {
                renamed.insert(old, new);
            }
            numbers.push(number);
        }
        plan.push((id, numbers));
    }
    if renamed.is_empty() {
        return StageOutcome::unchanged();
    }
    info!(residues = renamed.len(), "Renumbered residues.");

    let primary = model.index;
    let links = structure
        .disulfides()
        .iter()
        .map(|link| {
            let remap = |key: &ResidueKey| renamed.get(key).cloned().unwrap_or_else(|| key.clone());
            DisulfideLink::new(remap(&link.first), remap(&link.second))
        })
        .collect();
    let revised = structure
        .rebuild(|model| {
            if model.index != primary {
                return;
            }
            for (chain, (id, numbers)) in model.chains_mut().iter_mut().zip(&plan) {
                chain.id = id.clone();
                for (residue, &number) in chain.residues_mut().iter_mut().zip(numbers) {
                    residue.number = number;
                    residue.insertion_code = None;
                }
            }
        })
        .with_disulfides(links);
    let mut outcome = StageOutcome::changed(revised);
    outcome.renamed = renamed;
    outcome
}
