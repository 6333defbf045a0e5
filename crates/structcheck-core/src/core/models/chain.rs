use super::residue::{Residue, ResidueClass};
use crate::core::topology::classes::{NucleicAcid, nucleic_acid_kind};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainType {
    Protein,
    Dna,
    Rna,
    Ligand,
    Water,
    Mixed,
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChainType::Protein => "Protein",
                ChainType::Dna => "DNA",
                ChainType::Rna => "RNA",
                ChainType::Ligand => "Ligand",
                ChainType::Water => "Water",
                ChainType::Mixed => "Mixed",
            }
        )
    }
}

/// Atom-weighted molecule-type distribution of a chain, waters excluded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChainComposition {
    pub protein: f64,
    pub dna: f64,
    pub rna: f64,
    pub other: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: String,                    // Chain identifier (e.g., "A"); may be blank in deposits
    pub(crate) residues: Vec<Residue>, // Residues in deposition order
}

impl Chain {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut Vec<Residue> {
        &mut self.residues
    }

    pub fn push_residue(&mut self, residue: Residue) {
        self.residues.push(residue);
    }

    pub fn atom_count(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }

    pub fn is_unlabelled(&self) -> bool {
        self.id.trim().is_empty()
    }

    pub fn composition(&self) -> ChainComposition {
        let mut counts = [0usize; 4];
        for residue in &self.residues {
            let slot = match residue.class {
                ResidueClass::Water => continue,
                ResidueClass::AminoAcid => 0,
                ResidueClass::Nucleotide => match nucleic_acid_kind(&residue.name) {
                    Some(NucleicAcid::Dna) => 1,
                    Some(NucleicAcid::Rna) => 2,
                    None => 3,
                },
                _ => 3,
            };
            counts[slot] += residue.atoms.len();
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            return ChainComposition::default();
        }
        let fraction = |n: usize| n as f64 / total as f64;
        ChainComposition {
            protein: fraction(counts[0]),
            dna: fraction(counts[1]),
            rna: fraction(counts[2]),
            other: fraction(counts[3]),
        }
    }

    /// Classifies the chain by its dominant molecule type. A type dominates when its atom
    /// fraction exceeds `threshold`.
    pub fn classify(&self, threshold: f64) -> ChainType {
        let composition = self.composition();
        if composition.protein > threshold {
            return ChainType::Protein;
        }
        if composition.dna > threshold {
            return ChainType::Dna;
        }
        if composition.rna > threshold {
            return ChainType::Rna;
        }
        let non_water = self
            .residues
            .iter()
            .filter(|r| r.class != ResidueClass::Water)
            .count();
        if non_water == 0 && !self.residues.is_empty() {
            return ChainType::Water;
        }
        if composition.other > threshold {
            return ChainType::Ligand;
        }
        ChainType::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    fn residue_with_atoms(name: &str, class: ResidueClass, n: usize) -> Residue {
        let mut residue = Residue::new(name, 1, None, class);
        for i in 0..n {
            residue.push_atom(Atom::new(&format!("X{}", i), "C", Point3::origin()));
        }
        residue
    }

    #[test]
    fn protein_chain_with_waters_is_classified_protein() {
        let mut chain = Chain::new("A");
        chain.push_residue(residue_with_atoms("ALA", ResidueClass::AminoAcid, 5));
        chain.push_residue(residue_with_atoms("SO4", ResidueClass::Ligand, 5));
        chain.push_residue(residue_with_atoms("GLY", ResidueClass::AminoAcid, 4));
        for _ in 0..20 {
            chain.push_residue(residue_with_atoms("HOH", ResidueClass::Water, 1));
        }
        let composition = chain.composition();
        assert!((composition.protein - 9.0 / 14.0).abs() < 1e-12);
        assert_eq!(chain.classify(0.5), ChainType::Protein);
    }

    #[test]
    fn dna_and_rna_are_distinguished_by_residue_name() {
        let mut dna = Chain::new("B");
        dna.push_residue(residue_with_atoms("DA", ResidueClass::Nucleotide, 20));
        assert_eq!(dna.classify(0.5), ChainType::Dna);

        let mut rna = Chain::new("C");
        rna.push_residue(residue_with_atoms("U", ResidueClass::Nucleotide, 20));
        assert_eq!(rna.classify(0.5), ChainType::Rna);
    }

    #[test]
    fn even_split_is_mixed() {
        let mut chain = Chain::new("D");
        chain.push_residue(residue_with_atoms("ALA", ResidueClass::AminoAcid, 5));
        chain.push_residue(residue_with_atoms("DG", ResidueClass::Nucleotide, 5));
        assert_eq!(chain.classify(0.5), ChainType::Mixed);
    }

    #[test]
    fn water_only_and_blank_ids() {
        let mut chain = Chain::new(" ");
        chain.push_residue(residue_with_atoms("HOH", ResidueClass::Water, 1));
        assert_eq!(chain.classify(0.5), ChainType::Water);
        assert!(chain.is_unlabelled());
    }
}
