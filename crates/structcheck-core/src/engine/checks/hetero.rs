use crate::core::models::chain::Chain;
use crate::core::models::residue::{Residue, ResidueClass};
use crate::core::topology::classes;
use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;

/// Heteroatom residues that are neither polymer nor water: single-atom residues are metal
/// candidates, the rest ligand candidates.
fn hetero_residues<'a>(ctx: &CheckContext<'a>) -> impl Iterator<Item = (&'a Chain, &'a Residue)> {
    ctx.model.residues().filter(|(_, residue)| {
        let flagged = residue.is_hetero() || matches!(residue.class, ResidueClass::Ion | ResidueClass::Ligand);
        flagged && !residue.class.is_polymer() && residue.class != ResidueClass::Water
    })
}

pub fn run_metals(ctx: &CheckContext) -> Vec<Finding> {
    hetero_residues(ctx)
        .filter(|(_, residue)| residue.atoms().len() == 1)
        .map(|(chain, residue)| Finding::MetalDetection {
            residue: residue.key(&chain.id),
            name: residue.name.clone(),
            element: residue.atoms()[0].element.clone(),
            charge: classes::ion_charge(&residue.name),
        })
        .collect()
}

pub fn run_ligands(ctx: &CheckContext) -> Vec<Finding> {
    hetero_residues(ctx)
        .filter(|(_, residue)| residue.atoms().len() > 1)
        .map(|(chain, residue)| Finding::LigandDetection {
            residue: residue.key(&chain.id),
            name: residue.name.clone(),
            atoms: residue.atoms().len(),
            additive: classes::is_crystallization_additive(&residue.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::topology::registry::TopologyRegistry;
    use crate::engine::config::CheckConfig;
    use crate::test_utils::{add_hetero_residue, ideal_peptide_structure};
    use nalgebra::Point3;

    #[test]
    fn ions_and_ligands_are_split_by_atom_count() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "GG")]);
        let structure = add_hetero_residue(&registry, &structure, "A", 101, "ZN", &[("ZN", "ZN", Point3::new(20.0, 0.0, 0.0))]);
        let structure = add_hetero_residue(
            &registry,
            &structure,
            "A",
            102,
            "SO4",
            &[
                ("S", "S", Point3::new(30.0, 0.0, 0.0)),
                ("O1", "O", Point3::new(31.5, 0.0, 0.0)),
                ("O2", "O", Point3::new(29.5, 1.4, 0.0)),
            ],
        );
        let structure = add_hetero_residue(&registry, &structure, "A", 201, "HOH", &[("O", "O", Point3::new(40.0, 0.0, 0.0))]);
        let ctx = CheckContext::new(&structure, &registry, &config);

        let metals = run_metals(&ctx);
        assert_eq!(metals.len(), 1);
        assert!(matches!(
            &metals[0],
            Finding::MetalDetection { name, element, charge: Some(2), .. } if name == "ZN" && element == "ZN"
        ));

        let ligands = run_ligands(&ctx);
        assert_eq!(ligands.len(), 1);
        assert!(matches!(
            &ligands[0],
            Finding::LigandDetection { name, atoms: 3, additive: true, .. } if name == "SO4"
        ));
    }
}
