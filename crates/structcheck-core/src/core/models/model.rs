use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomKey, ResidueKey};
use super::residue::Residue;

/// Position of one atom inside a [`Model`]: chain, residue and atom indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomSite {
    pub chain: usize,
    pub residue: usize,
    pub atom: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub index: usize, // 1-based model serial
    pub(crate) chains: Vec<Chain>,
}

impl Model {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            chains: Vec::new(),
        }
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chains_mut(&mut self) -> &mut Vec<Chain> {
        &mut self.chains
    }

    pub fn push_chain(&mut self, chain: Chain) {
        self.chains.push(chain);
    }

    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn atom_count(&self) -> usize {
        self.chains.iter().map(Chain::atom_count).sum()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residues.len()).sum()
    }

    /// Iterates residues in deposition order together with their owning chain.
    pub fn residues(&self) -> impl Iterator<Item = (&Chain, &Residue)> {
        self.chains
            .iter()
            .flat_map(|chain| chain.residues.iter().map(move |residue| (chain, residue)))
    }

    pub fn find_residue(&self, key: &ResidueKey) -> Option<&Residue> {
        self.chain(&key.chain)?
            .residues
            .iter()
            .find(|r| r.number == key.number && r.insertion_code == key.insertion_code)
    }

    pub fn find_residue_mut(&mut self, key: &ResidueKey) -> Option<&mut Residue> {
        self.chains
            .iter_mut()
            .find(|c| c.id == key.chain)?
            .residues
            .iter_mut()
            .find(|r| r.number == key.number && r.insertion_code == key.insertion_code)
    }

    /// Flattens the model into atom sites, in deposition order.
    pub fn atom_sites(&self) -> Vec<AtomSite> {
        let mut sites = Vec::with_capacity(self.atom_count());
        for (c, chain) in self.chains.iter().enumerate() {
            for (r, residue) in chain.residues.iter().enumerate() {
                for a in 0..residue.atoms.len() {
                    sites.push(AtomSite {
                        chain: c,
                        residue: r,
                        atom: a,
                    });
                }
            }
        }
        sites
    }

    #[inline]
    pub fn chain_at(&self, site: AtomSite) -> &Chain {
        &self.chains[site.chain]
    }

    #[inline]
    pub fn residue_at(&self, site: AtomSite) -> &Residue {
        &self.chains[site.chain].residues[site.residue]
    }

    #[inline]
    pub fn atom_at(&self, site: AtomSite) -> &Atom {
        &self.chains[site.chain].residues[site.residue].atoms[site.atom]
    }

    pub fn atom_key(&self, site: AtomSite) -> AtomKey {
        let chain = self.chain_at(site);
        let residue = self.residue_at(site);
        let atom = self.atom_at(site);
        AtomKey {
            residue: residue.key(&chain.id),
            residue_name: residue.name.clone(),
            atom: atom.name.clone(),
            altloc: atom.altloc,
        }
    }

    /// Drops residues without atoms and chains without residues.
    pub fn prune_empty(&mut self) {
        for chain in &mut self.chains {
            chain.residues.retain(|r| !r.is_empty());
        }
        self.chains.retain(|c| !c.residues.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::residue::ResidueClass;
    use nalgebra::Point3;

    fn model() -> Model {
        let mut model = Model::new(1);
        for id in ["A", "B"] {
            let mut chain = Chain::new(id);
            for n in 1..=2 {
                let mut residue = Residue::new("GLY", n, None, ResidueClass::AminoAcid);
                residue.push_atom(Atom::new("N", "N", Point3::origin()));
                residue.push_atom(Atom::new("CA", "C", Point3::origin()));
                chain.push_residue(residue);
            }
            model.push_chain(chain);
        }
        model
    }

    #[test]
    fn atom_sites_cover_every_atom_in_order() {
        let model = model();
        let sites = model.atom_sites();
        assert_eq!(sites.len(), model.atom_count());
        assert_eq!(sites[0], AtomSite { chain: 0, residue: 0, atom: 0 });
        assert_eq!(sites[7], AtomSite { chain: 1, residue: 1, atom: 1 });
        assert_eq!(model.atom_key(sites[7]).to_string(), "B:2/GLY/CA");
    }

    #[test]
    fn find_residue_uses_full_key() {
        let model = model();
        assert!(model.find_residue(&ResidueKey::new("B", 2, None)).is_some());
        assert!(model.find_residue(&ResidueKey::new("B", 2, Some('A'))).is_none());
        assert!(model.find_residue(&ResidueKey::new("C", 1, None)).is_none());
    }

    #[test]
    fn prune_empty_removes_emptied_containers() {
        let mut model = model();
        model.chains[1].residues.iter_mut().for_each(|r| r.atoms.clear());
        model.chains[0].residues[0].atoms.clear();
        model.prune_empty();
        assert_eq!(model.chains.len(), 1);
        assert_eq!(model.chains[0].residues.len(), 1);
    }
}
