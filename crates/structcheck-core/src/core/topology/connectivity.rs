use super::classes::covalent_radius;
use super::registry::TopologyRegistry;
use crate::core::models::model::{AtomSite, Model};
use crate::core::models::residue::{Residue, ResidueClass};
use crate::core::models::structure::DisulfideLink;
use std::collections::{HashMap, VecDeque};
use tracing::trace;

const BOND_TOLERANCE: f64 = 0.45;
const MIN_BOND_LENGTH: f64 = 0.4;
const HYDROGEN_BOND_MAX: f64 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectivityOptions {
    /// Longest C(i)-N(i+1) (or O3'-P) distance still treated as a polymer link.
    pub peptide_bond_max: f64,
    /// Longest SG-SG distance treated as a disulfide bond.
    pub disulfide_cutoff: f64,
    /// Atom pairs separated by at most this many bonds are excluded from contact analysis.
    /// Pairs one bond further apart are vicinal: only severe overlaps count for them.
    pub exclusion_depth: usize,
}

impl Default for ConnectivityOptions {
    fn default() -> Self {
        Self {
            peptide_bond_max: 2.0,
            disulfide_cutoff: 2.5,
            exclusion_depth: 2,
        }
    }
}

/// Covalent bond graph over the flattened atom sites of one model.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    adjacency: Vec<Vec<usize>>,
    excluded: Vec<Vec<usize>>,
    vicinal: Vec<Vec<usize>>,
}

impl Connectivity {
    /// Builds the bond graph from residue templates, polymer links, disulfides and, for
    /// residues without a template, covalent-radius bond inference.
    ///
    /// `sites` must be the output of [`Model::atom_sites`] for `model`.
    pub fn build(
        model: &Model,
        sites: &[AtomSite],
        registry: &TopologyRegistry,
        links: &[DisulfideLink],
        options: &ConnectivityOptions,
    ) -> Self {
        let mut graph = GraphBuilder::new(sites.len());
        let offsets = residue_offsets(model);

        for (c, chain) in model.chains().iter().enumerate() {
            for (r, residue) in chain.residues().iter().enumerate() {
                let base = offsets[c][r];
                graph.add_residue_bonds(residue, base, registry);
            }
            for r in 1..chain.residues().len() {
                let prev = &chain.residues()[r - 1];
                let next = &chain.residues()[r];
                let (tail, head) = match (prev.class, next.class) {
                    (ResidueClass::AminoAcid, ResidueClass::AminoAcid) => ("C", "N"),
                    (ResidueClass::Nucleotide, ResidueClass::Nucleotide) => ("O3'", "P"),
                    _ => continue,
                };
                graph.link_residues(
                    (prev, offsets[c][r - 1], tail),
                    (next, offsets[c][r], head),
                    options.peptide_bond_max,
                );
            }
        }

        let sulfurs: Vec<(usize, AtomSite)> = sites
            .iter()
            .enumerate()
            .filter(|(_, site)| {
                let residue = model.residue_at(**site);
                registry.canonical_name(&residue.name) == Some("CYS")
                    && model.atom_at(**site).name == "SG"
            })
            .map(|(i, site)| (i, *site))
            .collect();
        for (x, &(i, site_i)) in sulfurs.iter().enumerate() {
            for &(j, site_j) in &sulfurs[x + 1..] {
                if site_i.chain == site_j.chain && site_i.residue == site_j.residue {
                    continue;
                }
                let a = model.atom_at(site_i);
                let b = model.atom_at(site_j);
                let key_i = model.residue_at(site_i).key(&model.chain_at(site_i).id);
                let key_j = model.residue_at(site_j).key(&model.chain_at(site_j).id);
                let linked = links.iter().any(|l| l.involves(&key_i) && l.involves(&key_j));
                if a.shares_conformer_with(b) && (linked || a.distance(b) <= options.disulfide_cutoff) {
                    graph.add(i, j);
                }
            }
        }

        let adjacency = graph.finish();
        let (excluded, vicinal) = exclusion_sets(&adjacency, options.exclusion_depth);
        trace!(atoms = adjacency.len(), "Connectivity graph built.");
        Self {
            adjacency,
            excluded,
            vicinal,
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn neighbors(&self, atom: usize) -> &[usize] {
        &self.adjacency[atom]
    }

    /// Every bond once, as `(low, high)` index pairs.
    pub fn bonds(&self) -> Vec<(usize, usize)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(i, ns)| ns.iter().filter(move |&&j| j > i).map(move |&j| (i, j)))
            .collect()
    }

    /// Atoms within the exclusion depth of `atom`, sorted, `atom` itself not included.
    pub fn excluded(&self, atom: usize) -> &[usize] {
        &self.excluded[atom]
    }

    #[inline]
    pub fn is_excluded(&self, a: usize, b: usize) -> bool {
        a == b || self.excluded[a].binary_search(&b).is_ok()
    }

    /// Atoms exactly one bond beyond the exclusion depth of `atom` (1-4 pairs at the default
    /// depth), sorted.
    pub fn vicinal(&self, atom: usize) -> &[usize] {
        &self.vicinal[atom]
    }

    #[inline]
    pub fn is_vicinal(&self, a: usize, b: usize) -> bool {
        self.vicinal[a].binary_search(&b).is_ok()
    }
}

/// Flat index of the first atom of every residue, per chain.
pub(crate) fn residue_offsets(model: &Model) -> Vec<Vec<usize>> {
    let mut next = 0;
    model
        .chains()
        .iter()
        .map(|chain| {
            chain
                .residues()
                .iter()
                .map(|residue| {
                    let start = next;
                    next += residue.atoms().len();
                    start
                })
                .collect()
        })
        .collect()
}

struct GraphBuilder {
    adjacency: Vec<Vec<usize>>,
}

impl GraphBuilder {
    fn new(n: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); n],
        }
    }

    fn add(&mut self, a: usize, b: usize) {
        if a != b && !self.adjacency[a].contains(&b) {
            self.adjacency[a].push(b);
            self.adjacency[b].push(a);
        }
    }

    fn add_residue_bonds(&mut self, residue: &Residue, base: usize, registry: &TopologyRegistry) {
        let atoms = residue.atoms();
        match registry.get(&residue.name) {
            Some(template) => {
                let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
                for (i, atom) in atoms.iter().enumerate() {
                    by_name.entry(atom.name.as_str()).or_default().push(i);
                }
                for (a, b) in template.bonded_pairs() {
                    let (Some(xs), Some(ys)) = (by_name.get(a), by_name.get(b)) else {
                        continue;
                    };
                    for &x in xs {
                        for &y in ys {
                            if atoms[x].shares_conformer_with(&atoms[y]) {
                                self.add(base + x, base + y);
                            }
                        }
                    }
                }
                for (h, hydrogen) in atoms.iter().enumerate().filter(|(_, a)| a.is_hydrogen()) {
                    let parent = atoms
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| !a.is_hydrogen() && a.shares_conformer_with(hydrogen))
                        .map(|(i, a)| (i, a.distance(hydrogen)))
                        .filter(|(_, d)| *d <= HYDROGEN_BOND_MAX)
                        .min_by(|x, y| x.1.total_cmp(&y.1));
                    if let Some((p, _)) = parent {
                        self.add(base + h, base + p);
                    }
                }
            }
            None => {
                for i in 0..atoms.len() {
                    for j in i + 1..atoms.len() {
                        let (a, b) = (&atoms[i], &atoms[j]);
                        if !a.shares_conformer_with(b) {
                            continue;
                        }
                        let d = a.distance(b);
                        let limit = covalent_radius(&a.element) + covalent_radius(&b.element) + BOND_TOLERANCE;
                        if d > MIN_BOND_LENGTH && d <= limit {
                            self.add(base + i, base + j);
                        }
                    }
                }
            }
        }
    }

    fn link_residues(
        &mut self,
        (prev, prev_base, tail): (&Residue, usize, &str),
        (next, next_base, head): (&Residue, usize, &str),
        max_distance: f64,
    ) {
        for (i, a) in prev.atoms().iter().enumerate().filter(|(_, a)| a.name == tail) {
            for (j, b) in next.atoms().iter().enumerate().filter(|(_, b)| b.name == head) {
                if a.shares_conformer_with(b) && a.distance(b) <= max_distance {
                    self.add(prev_base + i, next_base + j);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Vec<usize>> {
        for neighbors in &mut self.adjacency {
            neighbors.sort_unstable();
        }
        self.adjacency
    }
}

/// Per atom, the atoms within `depth` bonds and the atoms exactly `depth + 1` bonds away.
fn exclusion_sets(adjacency: &[Vec<usize>], depth: usize) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let mut depth_of = vec![usize::MAX; adjacency.len()];
    let mut queue = VecDeque::new();
    let mut excluded = Vec::with_capacity(adjacency.len());
    let mut vicinal = Vec::with_capacity(adjacency.len());
    for start in 0..adjacency.len() {
        let mut reached = Vec::new();
        depth_of[start] = 0;
        queue.push_back(start);
        while let Some(atom) = queue.pop_front() {
            let d = depth_of[atom];
            if d > depth {
                continue;
            }
            for &next in &adjacency[atom] {
                if depth_of[next] == usize::MAX {
                    depth_of[next] = d + 1;
                    reached.push(next);
                    queue.push_back(next);
                }
            }
        }
        let (mut near, mut far): (Vec<usize>, Vec<usize>) =
            reached.iter().copied().partition(|&atom| depth_of[atom] <= depth);
        depth_of[start] = usize::MAX;
        for &atom in &reached {
            depth_of[atom] = usize::MAX;
        }
        near.sort_unstable();
        far.sort_unstable();
        excluded.push(near);
        vicinal.push(far);
    }
    (excluded, vicinal)
}
