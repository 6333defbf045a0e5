//! Ideal-geometry fixtures shared by unit tests.

use crate::core::models::atom::Atom;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::chain::Chain;
use crate::core::models::ids::ResidueKey;
use crate::core::models::residue::Residue;
use crate::core::models::structure::{Structure, StructureMetadata};
use crate::core::topology::registry::{TERMINAL_OXYGEN, TopologyRegistry};
use crate::core::utils::geometry::{place_atom, sp2_third_position};
use crate::engine::repairs::chirality::invert_center;
use crate::engine::repairs::sidechains::build_missing;
use nalgebra::{Point3, Vector3};

const CHAIN_SPACING: f64 = 30.0;
const PHI: f64 = -120.0;
const PSI: f64 = 120.0;
const OMEGA: f64 = 180.0;

fn three_letter(code: char) -> &'static str {
    match code {
        'A' => "ALA",
        'R' => "ARG",
        'N' => "ASN",
        'D' => "ASP",
        'C' => "CYS",
        'Q' => "GLN",
        'E' => "GLU",
        'G' => "GLY",
        'H' => "HIS",
        'I' => "ILE",
        'L' => "LEU",
        'K' => "LYS",
        'M' => "MET",
        'F' => "PHE",
        'P' => "PRO",
        'S' => "SER",
        'T' => "THR",
        'W' => "TRP",
        'Y' => "TYR",
        'V' => "VAL",
        other => panic!("no residue for one-letter code {other}"),
    }
}

/// Backbone traces `(N, CA, C)` of an extended chain.
fn backbone_trace(length: usize) -> Vec<[Point3<f64>; 3]> {
    let mut trace = Vec::with_capacity(length);
    let n = Point3::origin();
    let ca = Point3::new(1.458, 0.0, 0.0);
    let c = place_atom(&Point3::new(0.0, 1.0, 0.0), &n, &ca, 1.525, 111.2, PHI).unwrap();
    trace.push([n, ca, c]);
    for _ in 1..length {
        let [n, ca, c] = trace[trace.len() - 1];
        let next_n = place_atom(&n, &ca, &c, 1.329, 116.2, PSI).unwrap();
        let next_ca = place_atom(&ca, &c, &next_n, 1.458, 121.7, OMEGA).unwrap();
        let next_c = place_atom(&c, &next_n, &next_ca, 1.525, 111.2, PHI).unwrap();
        trace.push([next_n, next_ca, next_c]);
    }
    trace
}

/// Builds one model of extended polypeptide chains with template side chains.
///
/// Residues are numbered from 1, every chain ends with an OXT, and consecutive chains are
/// translated apart so they never touch.
pub(crate) fn ideal_peptide_structure(registry: &TopologyRegistry, chains: &[(&str, &str)]) -> Structure {
    let mut builder = StructureBuilder::new(registry);
    builder.start_model(1);
    for (index, (chain_id, sequence)) in chains.iter().enumerate() {
        let codes: Vec<char> = sequence.chars().collect();
        let trace = backbone_trace(codes.len());
        let axis = (trace[trace.len() - 1][1] - trace[0][1])
            .try_normalize(1e-6)
            .unwrap_or_else(Vector3::x);
        let across = axis
            .cross(&Vector3::z())
            .try_normalize(1e-6)
            .unwrap_or_else(|| axis.cross(&Vector3::y()).normalize());
        let shift = across * CHAIN_SPACING * index as f64;

        for (i, &code) in codes.iter().enumerate() {
            let name = three_letter(code);
            let [n, ca, c] = trace[i];
            let mut residue = Residue::new(name, i as isize + 1, None, registry.classify(name, false));
            residue.push_atom(Atom::new("N", "N", n));
            residue.push_atom(Atom::new("CA", "C", ca));
            residue.push_atom(Atom::new("C", "C", c));
            let o = match trace.get(i + 1) {
                Some([next_n, _, _]) => sp2_third_position(&c, &ca, next_n, 1.231).unwrap(),
                None => place_atom(&n, &ca, &c, 1.231, 120.5, PSI + 180.0).unwrap(),
            };
            residue.push_atom(Atom::new("O", "O", o));
            if let Some(template) = registry.get(name) {
                build_missing(&mut residue, template).unwrap();
            }
            if i + 1 == codes.len() {
                let oxt = sp2_third_position(&c, &ca, &o, 1.25).unwrap();
                residue.push_atom(Atom::new(TERMINAL_OXYGEN, "O", oxt));
            }
            for mut atom in residue.atoms().to_vec() {
                atom.position += shift;
                builder
                    .add_atom(chain_id, name, residue.number, None, atom)
                    .unwrap();
            }
        }
    }
    builder.build(StructureMetadata::default()).unwrap()
}

/// Marks every atom of a residue as conformer `A` with `occupancy_a` and appends a `B` copy
/// displaced by `shift` with the complementary occupancy.
pub(crate) fn add_altloc_copy(
    structure: &Structure,
    key: &ResidueKey,
    shift: Vector3<f64>,
    occupancy_a: f64,
) -> Structure {
    structure.rebuild(|model| {
        let residue = model.find_residue_mut(key).unwrap();
        let mut copies = Vec::new();
        for atom in residue.atoms_mut().iter_mut() {
            atom.altloc = Some('A');
            atom.occupancy = occupancy_a;
            let mut copy = atom.clone().with_altloc('B', 1.0 - occupancy_a);
            copy.position += shift;
            copies.push(copy);
        }
        residue.atoms_mut().extend(copies);
    })
}

pub(crate) fn place_residue_atom(structure: &Structure, key: &ResidueKey, atom: &str, position: Point3<f64>) -> Structure {
    structure.rebuild(|model| {
        model
            .find_residue_mut(key)
            .unwrap()
            .atom_mut(atom)
            .unwrap()
            .position = position;
    })
}

/// Appends a heteroatom residue to `chain`, creating the chain if needed.
pub(crate) fn add_hetero_residue(
    registry: &TopologyRegistry,
    structure: &Structure,
    chain: &str,
    number: isize,
    name: &str,
    atoms: &[(&str, &str, Point3<f64>)],
) -> Structure {
    structure.rebuild(|model| {
        let mut residue = Residue::new(name, number, None, registry.classify(name, true));
        for &(atom, element, position) in atoms {
            residue.push_atom(Atom::new(atom, element, position).as_hetero());
        }
        match model.chains_mut().iter_mut().find(|c| c.id == chain) {
            Some(existing) => existing.push_residue(residue),
            None => {
                let mut created = Chain::new(chain);
                created.push_residue(residue);
                model.push_chain(created);
            }
        }
    })
}

pub(crate) fn remove_atoms(structure: &Structure, key: &ResidueKey, names: &[&str]) -> Structure {
    structure.rebuild(|model| {
        model
            .find_residue_mut(key)
            .unwrap()
            .atoms_mut()
            .retain(|a| !names.contains(&a.name.as_str()));
    })
}

/// Inverts every template stereocenter of the given residues.
pub(crate) fn invert_stereocenters(registry: &TopologyRegistry, structure: &Structure, keys: &[ResidueKey]) -> Structure {
    structure.rebuild(|model| {
        for key in keys {
            let residue = model.find_residue_mut(key).unwrap();
            let Some(template) = registry.get(&residue.name) else {
                continue;
            };
            for center in &template.stereocenters {
                assert!(invert_center(residue, template, center));
            }
        }
    })
}

/// Sequence of each chain of [`contaminated_assembly`]: 12 threonines and 11 isoleucines.
pub(crate) fn assembly_sequence() -> String {
    format!("A{}TKEGSA", "TI".repeat(11))
}

fn atom_position(structure: &Structure, chain: &str, number: isize, atom: &str) -> Point3<f64> {
    structure
        .primary_model()
        .find_residue(&ResidueKey::new(chain, number, None))
        .unwrap()
        .atom(atom)
        .unwrap()
        .position
}

/// Three chains with 69 inverted stereocenters, 5 residues with alternate locations, no
/// terminal OXT, waters with hydrogens and 14 heteroatom residues (8 ions, 6 ligands), some
/// of them placed in charged, polar and apolar contact with chain `A`.
pub(crate) fn contaminated_assembly(registry: &TopologyRegistry) -> Structure {
    let sequence = assembly_sequence();
    let mut structure = ideal_peptide_structure(registry, &[("A", &sequence), ("B", &sequence), ("C", &sequence)]);
    let last = sequence.len() as isize;

    let mut stereo = Vec::new();
    for chain in ["A", "B", "C"] {
        structure = remove_atoms(&structure, &ResidueKey::new(chain, last, None), &[TERMINAL_OXYGEN]);
        stereo.extend((2..=24).map(|n| ResidueKey::new(chain, n, None)));
    }
    structure = invert_stereocenters(registry, &structure, &stereo);

    for (chain, number) in [("A", 3), ("A", 8), ("A", 27), ("B", 5), ("C", 28)] {
        structure = add_altloc_copy(&structure, &ResidueKey::new(chain, number, None), Vector3::new(0.2, 0.0, 0.0), 0.6);
    }

    let lys = 25;
    let glu = 26;
    let ala = last;
    let ce = atom_position(&structure, "A", lys, "CE");
    let nz = atom_position(&structure, "A", lys, "NZ");
    let cd = atom_position(&structure, "A", glu, "CD");
    let oe1 = atom_position(&structure, "A", glu, "OE1");
    let o = atom_position(&structure, "A", 12, "O");
    let ca = atom_position(&structure, "A", 12, "CA");
    let ca_ala = atom_position(&structure, "A", ala, "CA");
    let cb = atom_position(&structure, "A", ala, "CB");

    let sodium = nz + (nz - ce).normalize() * 3.0;
    let chloride = oe1 + (oe1 - cd).normalize() * 3.2;
    let sulfate_o = o + (o - ca).normalize() * 3.0;
    let glycerol_c = cb + (cb - ca_ala).normalize() * 2.6;

    let mut number = 101;
    let mut add = |structure: Structure, name: &str, atoms: &[(&str, &str, Point3<f64>)]| {
        let next = add_hetero_residue(registry, &structure, "A", number, name, atoms);
        number += 1;
        next
    };
    structure = add(structure, "NA", &[("NA", "NA", sodium)]);
    structure = add(structure, "CL", &[("CL", "CL", chloride)]);
    for (k, ion) in ["ZN", "MG", "CA", "K", "ZN", "CL"].iter().enumerate() {
        let far = Point3::new(-300.0 + 12.0 * k as f64, 300.0, 300.0);
        structure = add(structure, ion, &[(ion, ion, far)]);
    }
    structure = add(
        structure,
        "SO4",
        &[
            ("O1", "O", sulfate_o),
            ("S", "S", sulfate_o + Vector3::new(0.0, 0.0, 1.5)),
        ],
    );
    structure = add(
        structure,
        "GOL",
        &[
            ("C1", "C", glycerol_c),
            ("O1", "O", glycerol_c + Vector3::new(0.0, 0.0, 1.43)),
        ],
    );
    for k in 0..4 {
        let far = Point3::new(300.0, -300.0 + 12.0 * k as f64, 300.0);
        let name = if k % 2 == 0 { "SO4" } else { "GOL" };
        structure = add(structure, name, &[("O1", "O", far), ("C1", "C", far + Vector3::new(1.4, 0.0, 0.0))]);
    }
    for k in 0..3 {
        let site = Point3::new(-300.0, -300.0 + 12.0 * k as f64, -300.0);
        structure = add(
            structure,
            "HOH",
            &[("O", "O", site), ("H1", "H", site + Vector3::new(0.96, 0.0, 0.0))],
        );
    }
    structure
}
