use super::chemistry::AtomChemistry;
use super::classes;
use crate::core::models::atom::Atom;
use crate::core::models::residue::{Residue, ResidueClass};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Backbone atom names implied for every amino-acid template.
pub const BACKBONE_ATOMS: [&str; 4] = ["N", "CA", "C", "O"];
/// Carboxylate oxygen present only on chain-terminal residues.
pub const TERMINAL_OXYGEN: &str = "OXT";

const BACKBONE_BONDS: [[&str; 2]; 4] = [["N", "CA"], ["CA", "C"], ["C", "O"], ["C", "OXT"]];

const BUILTIN_TEMPLATES: &str = include_str!("../../../data/residues.toml");
const BUILTIN_ORIGIN: &str = "<builtin residues.toml>";

/// Internal-coordinate recipe placing `atom` from three reference atoms `from = [a, b, c]`:
/// bond length `c-atom`, angle `b-c-atom` and torsion `a-b-c-atom`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InternalCoordinate {
    pub atom: String,
    pub from: [String; 3],
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Handedness {
    Positive,
    Negative,
}

impl Handedness {
    pub fn matches(self, signed_volume: f64) -> bool {
        match self {
            Handedness::Positive => signed_volume > 0.0,
            Handedness::Negative => signed_volume < 0.0,
        }
    }
}

/// A chiral center: the signed volume of `substituents` taken around `center` must have the
/// reference `sign`. Exchanging the positions of the `swap` pair inverts the configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Stereocenter {
    pub center: String,
    pub substituents: [String; 3],
    pub sign: Handedness,
    pub swap: [String; 2],
}

/// Terminal amide group whose oxygen and nitrogen are indistinguishable by density.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AmideGroup {
    pub carbon: String,
    pub oxygen: String,
    pub nitrogen: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ResidueTemplate {
    pub one_letter: char,
    #[serde(default)]
    pub sidechain: Vec<String>,
    #[serde(default)]
    pub bonds: Vec<[String; 2]>,
    #[serde(default)]
    pub build: Vec<InternalCoordinate>,
    #[serde(default)]
    pub stereocenters: Vec<Stereocenter>,
    #[serde(default)]
    pub amide: Option<AmideGroup>,
    #[serde(default)]
    pub donors: Vec<String>,
    #[serde(default)]
    pub acceptors: Vec<String>,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

impl ResidueTemplate {
    /// Backbone followed by side-chain atom names, terminal OXT excluded.
    pub fn canonical_atoms(&self) -> impl Iterator<Item = &str> {
        BACKBONE_ATOMS
            .iter()
            .copied()
            .chain(self.sidechain.iter().map(String::as_str))
    }

    /// Covalent bonds between atom names, backbone included.
    pub fn bonded_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        BACKBONE_BONDS
            .iter()
            .map(|[a, b]| (*a, *b))
            .chain(self.bonds.iter().map(|[a, b]| (a.as_str(), b.as_str())))
    }

    pub fn recipe(&self, atom: &str) -> Option<&InternalCoordinate> {
        self.build.iter().find(|ic| ic.atom == atom)
    }

    fn contains(list: &[String], atom: &str) -> bool {
        list.iter().any(|a| a == atom)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    residues: HashMap<String, ResidueTemplate>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

/// Read-only lookup of residue templates, aliases and classification tables.
#[derive(Debug, Clone, Default)]
pub struct TopologyRegistry {
    templates: HashMap<String, ResidueTemplate>,
    aliases: HashMap<String, String>,
}

impl TopologyRegistry {
    /// The standard amino-acid templates shipped with the library.
    pub fn builtin() -> Result<Self, TopologyLoadError> {
        Self::from_toml_str(BUILTIN_TEMPLATES, BUILTIN_ORIGIN)
    }

    pub fn load(path: &Path) -> Result<Self, TopologyLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TopologyLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, TopologyLoadError> {
        let file: RegistryFile = toml::from_str(content).map_err(|e| TopologyLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        for (alias, target) in &file.aliases {
            if !file.residues.contains_key(target) {
                return Err(TopologyLoadError::DanglingAlias {
                    path: origin.to_string(),
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(Self {
            templates: file.residues,
            aliases: file.aliases,
        })
    }

    /// Adds or replaces templates and aliases with those of `other`.
    pub fn extend(&mut self, other: TopologyRegistry) {
        self.templates.extend(other.templates);
        self.aliases.extend(other.aliases);
    }

    /// Resolves aliases (e.g., `HIE`, `CYX`) to the canonical template name.
    pub fn canonical_name<'a>(&'a self, residue_name: &'a str) -> Option<&'a str> {
        if let Some((name, _)) = self.templates.get_key_value(residue_name) {
            return Some(name.as_str());
        }
        self.aliases.get(residue_name).map(String::as_str)
    }

    pub fn get(&self, residue_name: &str) -> Option<&ResidueTemplate> {
        self.canonical_name(residue_name)
            .and_then(|name| self.templates.get(name))
    }

    pub fn one_letter(&self, residue_name: &str) -> Option<char> {
        self.get(residue_name).map(|t| t.one_letter)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Classifies a residue name. Polymer-record names without a template are `Unknown`;
    /// unrecognized heteroatom names are ligands.
    pub fn classify(&self, residue_name: &str, hetero: bool) -> ResidueClass {
        if self.get(residue_name).is_some() {
            ResidueClass::AminoAcid
        } else if classes::is_water(residue_name) {
            ResidueClass::Water
        } else if classes::nucleic_acid_kind(residue_name).is_some() {
            ResidueClass::Nucleotide
        } else if classes::is_ion(residue_name) {
            ResidueClass::Ion
        } else if hetero {
            ResidueClass::Ligand
        } else {
            ResidueClass::Unknown
        }
    }

    /// Hydrogen-bonding and charge character of an atom in its residue context.
    pub fn chemistry(&self, residue: &Residue, atom: &Atom) -> AtomChemistry {
        if atom.is_hydrogen() {
            return AtomChemistry::APOLAR;
        }
        match residue.class {
            ResidueClass::Water if atom.element == "O" => AtomChemistry::BOTH,
            ResidueClass::Ion => AtomChemistry::charged(classes::ion_charge(&residue.name).unwrap_or(0)),
            ResidueClass::AminoAcid => match self.get(&residue.name) {
                Some(template) => Self::template_chemistry(template, &residue.name, atom),
                None => AtomChemistry::from_element(&atom.element),
            },
            _ => AtomChemistry::from_element(&atom.element),
        }
    }

    fn template_chemistry(template: &ResidueTemplate, residue_name: &str, atom: &Atom) -> AtomChemistry {
        match atom.name.as_str() {
            "N" if template.one_letter == 'P' => return AtomChemistry::APOLAR,
            "N" => return AtomChemistry::DONOR,
            "O" | "OXT" => return AtomChemistry::ACCEPTOR,
            _ => {}
        }
        let name = atom.name.as_str();
        let donor = ResidueTemplate::contains(&template.donors, name);
        let acceptor = ResidueTemplate::contains(&template.acceptors, name);
        let mut charge = 0;
        if ResidueTemplate::contains(&template.positive, name) {
            charge = 1;
        } else if ResidueTemplate::contains(&template.negative, name) {
            charge = -1;
        }
        // Doubly protonated histidine carries the ring charge.
        if matches!(residue_name, "HIP" | "HSP") && matches!(name, "ND1" | "NE2") {
            charge = 1;
        }
        if donor || acceptor || charge != 0 {
            AtomChemistry {
                donor,
                acceptor,
                charge,
            }
        } else if atom.element == "C" || atom.element == "S" {
            AtomChemistry::APOLAR
        } else {
            AtomChemistry::from_element(&atom.element)
        }
    }
}

#[derive(Debug, Error)]
pub enum TopologyLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Alias '{alias}' in '{path}' points to unknown residue '{target}'")]
    DanglingAlias {
        path: String,
        alias: String,
        target: String,
    },
}
