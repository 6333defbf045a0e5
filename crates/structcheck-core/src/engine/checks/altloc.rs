use crate::engine::context::CheckContext;
use crate::engine::findings::{AltlocShare, Finding};
use std::collections::BTreeMap;

/// Groups labelled atoms by residue and atom name; every group carrying more than one
/// distinct label becomes a finding with the per-label occupancies.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let tolerance = ctx.config.altloc_occupancy_tolerance;
    let mut findings = Vec::new();
    for (chain, residue) in ctx.model.residues() {
        let mut groups: BTreeMap<&str, Vec<AltlocShare>> = BTreeMap::new();
        for atom in residue.atoms() {
            if let Some(label) = atom.altloc {
                groups.entry(atom.name.as_str()).or_default().push(AltlocShare {
                    label,
                    occupancy: atom.occupancy,
                });
            }
        }
        for (atom, mut labels) in groups {
            labels.sort_by_key(|share| share.label);
            labels.dedup_by_key(|share| share.label);
            if labels.len() < 2 {
                continue;
            }
            let occupancy_sum: f64 = labels.iter().map(|share| share.occupancy).sum();
            findings.push(Finding::AltlocGroup {
                residue: residue.key(&chain.id),
                residue_name: residue.name.clone(),
                atom: atom.to_string(),
                labels,
                occupancy_sum,
                over_occupied: occupancy_sum > 1.0 + tolerance,
            });
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::ids::ResidueKey;
    use crate::core::topology::registry::TopologyRegistry;
    use crate::engine::config::CheckConfig;
    use crate::test_utils::{add_altloc_copy, ideal_peptide_structure};
    use nalgebra::Vector3;

    #[test]
    fn split_residue_yields_one_group_per_atom() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "GSA")]);
        let structure = add_altloc_copy(&structure, &ResidueKey::new("A", 2, None), Vector3::new(0.3, 0.0, 0.0), 0.6);
        let ctx = CheckContext::new(&structure, &registry, &config);
        let findings = run(&ctx);
        // SER carries N, CA, C, O, CB and OG in two conformers.
        assert_eq!(findings.len(), 6);
        let Finding::AltlocGroup {
            labels,
            occupancy_sum,
            over_occupied,
            ..
        } = &findings[0]
        else {
            panic!("unexpected finding {:?}", findings[0]);
        };
        assert_eq!(labels.iter().map(|s| s.label).collect::<Vec<_>>(), ['A', 'B']);
        assert!((occupancy_sum - 1.0).abs() < 1e-9);
        assert!(!over_occupied);
    }

    #[test]
    fn over_occupied_groups_are_marked() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "G")]);
        let structure = structure.rebuild(|model| {
            let residue = model.find_residue_mut(&ResidueKey::new("A", 1, None)).unwrap();
            let ca = residue.atom("CA").unwrap().position;
            residue.atoms_mut().retain(|a| a.name != "CA");
            residue.push_atom(Atom::new("CA", "C", ca).with_altloc('A', 0.7));
            residue.push_atom(Atom::new("CA", "C", ca).with_altloc('B', 0.7));
        });
        let ctx = CheckContext::new(&structure, &registry, &config);
        let findings = run(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(matches!(findings[0], Finding::AltlocGroup { over_occupied: true, .. }));
    }
}
