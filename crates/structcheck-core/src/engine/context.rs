use super::config::CheckConfig;
use crate::core::models::atom::Atom;
use crate::core::models::ids::{AtomKey, ResidueKey};
use crate::core::models::model::{AtomSite, Model};
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::core::spatial::SpatialIndex;
use crate::core::topology::chemistry::AtomChemistry;
use crate::core::topology::connectivity::{Connectivity, ConnectivityOptions};
use crate::core::topology::registry::TopologyRegistry;
use nalgebra::Point3;

/// Read-only analysis view of the primary model of one structure revision.
///
/// Atom indices used by the spatial index, connectivity and chemistry tables all refer to
/// positions in [`sites`](Self::sites).
pub struct CheckContext<'a> {
    pub structure: &'a Structure,
    pub model: &'a Model,
    pub registry: &'a TopologyRegistry,
    pub config: &'a CheckConfig,
    pub sites: Vec<AtomSite>,
    pub positions: Vec<Point3<f64>>,
    pub chemistry: Vec<AtomChemistry>,
    pub index: SpatialIndex,
    pub connectivity: Connectivity,
}

impl<'a> CheckContext<'a> {
    pub fn new(structure: &'a Structure, registry: &'a TopologyRegistry, config: &'a CheckConfig) -> Self {
        let model = structure.primary_model();
        let sites = model.atom_sites();
        let positions: Vec<Point3<f64>> = sites.iter().map(|&s| model.atom_at(s).position).collect();
        let chemistry = sites
            .iter()
            .map(|&s| registry.chemistry(model.residue_at(s), model.atom_at(s)))
            .collect();
        let index = SpatialIndex::build(&positions, config.search_radius());
        let connectivity = Connectivity::build(
            model,
            &sites,
            registry,
            structure.disulfides(),
            &ConnectivityOptions {
                peptide_bond_max: config.peptide_bond_max,
                disulfide_cutoff: config.disulfide_cutoff,
                exclusion_depth: config.bond_exclusion_depth,
            },
        );
        Self {
            structure,
            model,
            registry,
            config,
            sites,
            positions,
            chemistry,
            index,
            connectivity,
        }
    }

    #[inline]
    pub fn atom(&self, i: usize) -> &'a Atom {
        self.model.atom_at(self.sites[i])
    }

    #[inline]
    pub fn residue(&self, i: usize) -> &'a Residue {
        self.model.residue_at(self.sites[i])
    }

    pub fn residue_key(&self, i: usize) -> ResidueKey {
        let site = self.sites[i];
        self.model.residue_at(site).key(&self.model.chain_at(site).id)
    }

    pub fn atom_key(&self, i: usize) -> AtomKey {
        self.model.atom_key(self.sites[i])
    }

    /// Whether two atom indices belong to the same residue.
    #[inline]
    pub fn same_residue(&self, a: usize, b: usize) -> bool {
        let (x, y) = (self.sites[a], self.sites[b]);
        x.chain == y.chain && x.residue == y.residue
    }

    /// Flat indices of the atoms of residue `residue` in chain `chain`.
    pub fn residue_atoms(&self, chain: usize, residue: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self
            .sites
            .partition_point(|s| (s.chain, s.residue) < (chain, residue));
        self.sites[start..]
            .iter()
            .take_while(move |s| s.chain == chain && s.residue == residue)
            .enumerate()
            .map(move |(offset, _)| start + offset)
    }
}
