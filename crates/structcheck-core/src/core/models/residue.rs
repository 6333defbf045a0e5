use super::atom::Atom;
use super::ids::ResidueKey;
use serde::Serialize;
use std::collections::BTreeSet;

/// Classification tag assigned from the topology reference when a residue is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResidueClass {
    AminoAcid,
    Nucleotide,
    Water,
    Ion,
    Ligand,
    Unknown,
}

impl ResidueClass {
    #[inline]
    pub fn is_polymer(self) -> bool {
        matches!(self, Self::AminoAcid | Self::Nucleotide)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub name: String,                // Residue name (e.g., "THR", "ZN", "HOH")
    pub number: isize,               // Sequence number from the source records
    pub insertion_code: Option<char>, // Insertion code breaking sequence-number ties
    pub class: ResidueClass,
    pub(crate) atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(name: &str, number: isize, insertion_code: Option<char>, class: ResidueClass) -> Self {
        Self {
            name: name.to_string(),
            number,
            insertion_code,
            class,
            atoms: Vec::new(),
        }
    }

    pub fn key(&self, chain_id: &str) -> ResidueKey {
        ResidueKey::new(chain_id, self.number, self.insertion_code)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut Vec<Atom> {
        &mut self.atoms
    }

    pub fn push_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// First atom copy with the given name.
    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }

    pub fn atom_mut(&mut self, name: &str) -> Option<&mut Atom> {
        self.atoms.iter_mut().find(|a| a.name == name)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom(name).is_some()
    }

    /// Names of present non-hydrogen atoms.
    pub fn heavy_atom_names(&self) -> BTreeSet<&str> {
        self.atoms
            .iter()
            .filter(|a| !a.is_hydrogen())
            .map(|a| a.name.as_str())
            .collect()
    }

    /// A residue is a heteroatom residue when every one of its atoms came from a
    /// heteroatom record.
    pub fn is_hetero(&self) -> bool {
        !self.atoms.is_empty() && self.atoms.iter().all(|a| a.is_hetero)
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn serine() -> Residue {
        let mut residue = Residue::new("SER", 4, None, ResidueClass::AminoAcid);
        for (name, element) in [("N", "N"), ("CA", "C"), ("CB", "C"), ("OG", "O"), ("HG", "H")] {
            residue.push_atom(Atom::new(name, element, Point3::origin()));
        }
        residue
    }

    #[test]
    fn atom_lookup_by_name_returns_first_copy() {
        let mut residue = serine();
        residue.push_atom(Atom::new("OG", "O", Point3::new(1.0, 0.0, 0.0)).with_altloc('B', 0.4));
        assert_eq!(residue.atom("OG").unwrap().position, Point3::origin());
        assert!(residue.has_atom("CB"));
        assert!(!residue.has_atom("C"));
    }

    #[test]
    fn heavy_atom_names_skip_hydrogens() {
        let residue = serine();
        let names: Vec<_> = residue.heavy_atom_names().into_iter().collect();
        assert_eq!(names, ["CA", "CB", "N", "OG"]);
    }

    #[test]
    fn hetero_requires_all_atoms_flagged() {
        let mut ion = Residue::new("ZN", 301, None, ResidueClass::Ion);
        assert!(!ion.is_hetero());
        ion.push_atom(Atom::new("ZN", "ZN", Point3::origin()).as_hetero());
        assert!(ion.is_hetero());
        assert!(!serine().is_hetero());
    }

    #[test]
    fn key_carries_chain_and_insertion_code() {
        let residue = Residue::new("GLY", 52, Some('A'), ResidueClass::AminoAcid);
        assert_eq!(residue.key("H").to_string(), "H:52A");
    }
}
