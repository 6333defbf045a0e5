use crate::core::models::chain::{ChainComposition, ChainType};
use crate::core::models::ids::{AtomKey, ResidueKey};
use crate::core::topology::registry::Handedness;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClashCategory {
    Severe,
    Positive,
    Negative,
    PolarDonor,
    PolarAcceptor,
    Apolar,
}

impl fmt::Display for ClashCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClashCategory::Severe => "severe",
            ClashCategory::Positive => "positive",
            ClashCategory::Negative => "negative",
            ClashCategory::PolarDonor => "polar_donor",
            ClashCategory::PolarAcceptor => "polar_acceptor",
            ClashCategory::Apolar => "apolar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClashPair {
    pub first: AtomKey,
    pub second: AtomKey,
    pub distance: f64,
    pub category: ClashCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AltlocShare {
    pub label: char,
    pub occupancy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// Non-consecutive sequence numbers.
    Numbering,
    /// Consecutive numbers but no peptide bond between them.
    ChainBreak,
}

/// A typed record produced by one check for one structure revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    ModelCount {
        count: usize,
        indices: Vec<usize>,
    },
    ChainSummary {
        chain: String,
        chain_type: ChainType,
        residues: usize,
        composition: ChainComposition,
    },
    UnlabelledChain {
        position: usize,
        residues: usize,
    },
    AltlocGroup {
        residue: ResidueKey,
        residue_name: String,
        atom: String,
        labels: Vec<AltlocShare>,
        occupancy_sum: f64,
        over_occupied: bool,
    },
    DisulfideCandidate {
        first: ResidueKey,
        second: ResidueKey,
        distance: f64,
    },
    AmbiguousCysteine {
        residue: ResidueKey,
        candidates: usize,
    },
    MetalDetection {
        residue: ResidueKey,
        name: String,
        element: String,
        charge: Option<i8>,
    },
    LigandDetection {
        residue: ResidueKey,
        name: String,
        atoms: usize,
        additive: bool,
    },
    HydrogenCount {
        count: usize,
    },
    WaterCount {
        count: usize,
    },
    AmideAmbiguity {
        residue: ResidueKey,
        residue_name: String,
        current_score: i32,
        swapped_score: i32,
        swap_recommended: bool,
    },
    ChiralityViolation {
        residue: ResidueKey,
        residue_name: String,
        center: String,
        signed_volume: f64,
        expected: Handedness,
    },
    MissingSidechainAtoms {
        residue: ResidueKey,
        residue_name: String,
        missing: Vec<String>,
    },
    MissingBackboneAtoms {
        residue: ResidueKey,
        residue_name: String,
        missing: Vec<String>,
    },
    BackboneGap {
        after: ResidueKey,
        before: ResidueKey,
        kind: GapKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
    },
    Clash(ClashPair),
    UnknownResidue {
        residue: ResidueKey,
        residue_name: String,
    },
}

impl Finding {
    /// The variant name as it appears in serialized output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Finding::ModelCount { .. } => "model_count",
            Finding::ChainSummary { .. } => "chain_summary",
            Finding::UnlabelledChain { .. } => "unlabelled_chain",
            Finding::AltlocGroup { .. } => "altloc_group",
            Finding::DisulfideCandidate { .. } => "disulfide_candidate",
            Finding::AmbiguousCysteine { .. } => "ambiguous_cysteine",
            Finding::MetalDetection { .. } => "metal_detection",
            Finding::LigandDetection { .. } => "ligand_detection",
            Finding::HydrogenCount { .. } => "hydrogen_count",
            Finding::WaterCount { .. } => "water_count",
            Finding::AmideAmbiguity { .. } => "amide_ambiguity",
            Finding::ChiralityViolation { .. } => "chirality_violation",
            Finding::MissingSidechainAtoms { .. } => "missing_sidechain_atoms",
            Finding::MissingBackboneAtoms { .. } => "missing_backbone_atoms",
            Finding::BackboneGap { .. } => "backbone_gap",
            Finding::Clash(_) => "clash",
            Finding::UnknownResidue { .. } => "unknown_residue",
        }
    }

    /// Whether the finding describes remaining risk rather than plain inventory.
    ///
    /// Counts, chain summaries, detections and disulfide candidates are informational; a
    /// cysteine is only a defect when it competes for more than one partner.
    pub fn is_defect(&self) -> bool {
        match self {
            Finding::ModelCount { .. }
            | Finding::ChainSummary { .. }
            | Finding::DisulfideCandidate { .. }
            | Finding::MetalDetection { .. }
            | Finding::LigandDetection { .. }
            | Finding::HydrogenCount { .. }
            | Finding::WaterCount { .. } => false,
            Finding::AmbiguousCysteine { candidates, .. } => *candidates > 1,
            Finding::AmideAmbiguity {
                swap_recommended, ..
            } => *swap_recommended,
            Finding::UnlabelledChain { .. }
            | Finding::AltlocGroup { .. }
            | Finding::ChiralityViolation { .. }
            | Finding::MissingSidechainAtoms { .. }
            | Finding::MissingBackboneAtoms { .. }
            | Finding::BackboneGap { .. }
            | Finding::Clash(_)
            | Finding::UnknownResidue { .. } => true,
        }
    }

    /// The residue a finding is attached to, if any.
    pub fn residue(&self) -> Option<&ResidueKey> {
        match self {
            Finding::AltlocGroup { residue, .. }
            | Finding::AmbiguousCysteine { residue, .. }
            | Finding::MetalDetection { residue, .. }
            | Finding::LigandDetection { residue, .. }
            | Finding::AmideAmbiguity { residue, .. }
            | Finding::ChiralityViolation { residue, .. }
            | Finding::MissingSidechainAtoms { residue, .. }
            | Finding::MissingBackboneAtoms { residue, .. }
            | Finding::UnknownResidue { residue, .. } => Some(residue),
            Finding::DisulfideCandidate { first, .. } => Some(first),
            Finding::BackboneGap { after, .. } => Some(after),
            Finding::Clash(pair) => Some(&pair.first.residue),
            Finding::ModelCount { .. }
            | Finding::ChainSummary { .. }
            | Finding::UnlabelledChain { .. }
            | Finding::HydrogenCount { .. }
            | Finding::WaterCount { .. } => None,
        }
    }

    /// Human-readable subject used in tables and logs.
    pub fn subject(&self) -> String {
        match self {
            Finding::ModelCount { count, .. } => format!("{count} model(s)"),
            Finding::ChainSummary { chain, chain_type, .. } => format!("chain {chain} ({chain_type})"),
            Finding::UnlabelledChain { position, .. } => format!("chain #{position}"),
            Finding::AltlocGroup {
                residue, residue_name, atom, ..
            } => format!("{residue}/{residue_name}/{atom}"),
            Finding::DisulfideCandidate { first, second, .. } => format!("{first}-{second}"),
            Finding::BackboneGap { after, before, .. } => format!("{after}..{before}"),
            Finding::Clash(pair) => format!("{} {}", pair.first, pair.second),
            Finding::HydrogenCount { count } | Finding::WaterCount { count } => count.to_string(),
            Finding::MetalDetection { residue, name, .. }
            | Finding::LigandDetection { residue, name, .. } => format!("{residue}/{name}"),
            Finding::AmideAmbiguity {
                residue, residue_name, ..
            }
            | Finding::ChiralityViolation {
                residue, residue_name, ..
            }
            | Finding::MissingSidechainAtoms {
                residue, residue_name, ..
            }
            | Finding::MissingBackboneAtoms {
                residue, residue_name, ..
            }
            | Finding::UnknownResidue {
                residue, residue_name,
            } => format!("{residue}/{residue_name}"),
            Finding::AmbiguousCysteine { residue, .. } => residue.to_string(),
        }
    }

    /// Revision-independent identity used to match findings across reports.
    ///
    /// Measured values (distances, volumes, scores) are left out, as are altloc labels,
    /// so a finding is matched by what it is about rather than by its current geometry.
    pub fn identity(&self) -> String {
        match self {
            Finding::ModelCount { .. } | Finding::HydrogenCount { .. } | Finding::WaterCount { .. } => {
                self.type_name().to_string()
            }
            Finding::ChainSummary { chain, chain_type, .. } => format!("chain_summary:{chain}:{chain_type}"),
            Finding::ChiralityViolation { residue, center, .. } => format!("chirality_violation:{residue}:{center}"),
            Finding::MissingSidechainAtoms { residue, .. } | Finding::MissingBackboneAtoms { residue, .. } => {
                format!("{}:{residue}", self.type_name())
            }
            Finding::Clash(pair) => {
                let mut ends = [clash_end(&pair.first), clash_end(&pair.second)];
                ends.sort();
                format!("clash:{}:{}:{}", ends[0], ends[1], pair.category)
            }
            Finding::AltlocGroup {
                residue, atom, ..
            } => format!("altloc_group:{residue}:{atom}"),
            _ => format!("{}:{}", self.type_name(), self.subject()),
        }
    }

    /// Rewrites residue identities after renumbering. Keys absent from `map` are kept.
    pub fn remap_residues(&mut self, map: &BTreeMap<ResidueKey, ResidueKey>) {
        let chain_of = |chain: &str| -> Option<String> {
            map.iter()
                .find(|(old, _)| old.chain == chain)
                .map(|(_, new)| new.chain.clone())
        };
        let remap = |key: &mut ResidueKey| {
            if let Some(new) = map.get(key) {
                *key = new.clone();
            }
        };
        match self {
            Finding::ChainSummary { chain, .. } => {
                if let Some(new) = chain_of(chain) {
                    *chain = new;
                }
            }
            Finding::AltlocGroup { residue, .. }
            | Finding::AmbiguousCysteine { residue, .. }
            | Finding::MetalDetection { residue, .. }
            | Finding::LigandDetection { residue, .. }
            | Finding::AmideAmbiguity { residue, .. }
            | Finding::ChiralityViolation { residue, .. }
            | Finding::MissingSidechainAtoms { residue, .. }
            | Finding::MissingBackboneAtoms { residue, .. }
            | Finding::UnknownResidue { residue, .. } => remap(residue),
            Finding::DisulfideCandidate { first, second, .. } => {
                remap(first);
                remap(second);
            }
            Finding::BackboneGap { after, before, .. } => {
                remap(after);
                remap(before);
            }
            Finding::Clash(pair) => {
                remap(&mut pair.first.residue);
                remap(&mut pair.second.residue);
            }
            Finding::ModelCount { .. }
            | Finding::UnlabelledChain { .. }
            | Finding::HydrogenCount { .. }
            | Finding::WaterCount { .. } => {}
        }
    }
}

fn clash_end(key: &AtomKey) -> String {
    format!("{}/{}", key.residue, key.atom)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    AmbiguousAltloc,
    UnknownResidue,
    CollaboratorUnavailable,
    NumericNonConvergence,
    Unresolved,
}

/// A non-fatal condition met by a repair stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairNote {
    pub stage: &'static str,
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residue: Option<ResidueKey>,
    pub message: String,
}

impl RepairNote {
    pub fn new(stage: &'static str, kind: NoteKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            residue: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, residue: ResidueKey) -> Self {
        self.residue = Some(residue);
        self
    }
}

impl fmt::Display for RepairNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.stage)?;
        if let Some(residue) = &self.residue {
            write!(f, "{residue}: ")?;
        }
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_key(chain: &str, number: isize, atom: &str, altloc: Option<char>) -> AtomKey {
        AtomKey {
            residue: ResidueKey::new(chain, number, None),
            residue_name: "LEU".into(),
            atom: atom.into(),
            altloc,
        }
    }

    #[test]
    fn findings_serialize_with_type_tag() {
        let finding = Finding::MissingSidechainAtoms {
            residue: ResidueKey::new("A", 7, Some('B')),
            residue_name: "LYS".into(),
            missing: vec!["NZ".into()],
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "missing_sidechain_atoms");
        assert_eq!(json["residue"], "A:7B");
        assert_eq!(finding.type_name(), "missing_sidechain_atoms");
    }

    #[test]
    fn clash_identity_ignores_order_distance_and_altloc() {
        let a = Finding::Clash(ClashPair {
            first: atom_key("A", 1, "CD1", Some('A')),
            second: atom_key("A", 9, "CD2", None),
            distance: 2.5,
            category: ClashCategory::Apolar,
        });
        let b = Finding::Clash(ClashPair {
            first: atom_key("A", 9, "CD2", None),
            second: atom_key("A", 1, "CD1", None),
            distance: 2.8,
            category: ClashCategory::Apolar,
        });
        assert_eq!(a.identity(), b.identity());
        assert!(a.is_defect());
    }

    #[test]
    fn cysteine_defect_requires_competition() {
        let lone = Finding::AmbiguousCysteine {
            residue: ResidueKey::new("A", 3, None),
            candidates: 0,
        };
        let contested = Finding::AmbiguousCysteine {
            residue: ResidueKey::new("A", 3, None),
            candidates: 2,
        };
        assert!(!lone.is_defect());
        assert!(contested.is_defect());
    }

    #[test]
    fn remap_rewrites_every_residue_reference() {
        let mut map = BTreeMap::new();
        map.insert(ResidueKey::new("X", 101, None), ResidueKey::new("A", 1, None));
        let mut gap = Finding::BackboneGap {
            after: ResidueKey::new("X", 101, None),
            before: ResidueKey::new("X", 105, None),
            kind: GapKind::Numbering,
            distance: None,
        };
        gap.remap_residues(&map);
        let Finding::BackboneGap { after, before, .. } = &gap else {
            unreachable!()
        };
        assert_eq!(after, &ResidueKey::new("A", 1, None));
        assert_eq!(before, &ResidueKey::new("X", 105, None));

        let mut summary = Finding::ChainSummary {
            chain: "X".into(),
            chain_type: ChainType::Protein,
            residues: 1,
            composition: ChainComposition::default(),
        };
        summary.remap_residues(&map);
        assert!(summary.identity().starts_with("chain_summary:A:"));
    }

    #[test]
    fn notes_render_stage_and_residue() {
        let note = RepairNote::new("backbone", NoteKind::CollaboratorUnavailable, "no modeler")
            .at(ResidueKey::new("B", 40, None));
        assert_eq!(note.to_string(), "[backbone] B:40: no modeler");
    }
}
