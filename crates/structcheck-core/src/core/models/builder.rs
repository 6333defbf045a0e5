use super::atom::{Atom, infer_element};
use super::chain::Chain;
use super::ids::ResidueKey;
use super::model::Model;
use super::residue::Residue;
use super::structure::{ModelError, Structure, StructureMetadata};
use crate::core::topology::registry::TopologyRegistry;
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// One atom record exactly as tokenized from its source, every field still textual.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAtom {
    pub hetero: bool,
    pub name: String,
    pub altloc: Option<char>,
    pub residue_name: String,
    pub chain: String,
    pub residue_number: String,
    pub insertion_code: Option<char>,
    pub x: String,
    pub y: String,
    pub z: String,
    pub occupancy: Option<String>,
    pub b_factor: Option<String>,
    pub element: Option<String>,
}

/// A tokenized input record handed over by a file adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Header { entry_id: String },
    Title(String),
    Method(String),
    Resolution(String),
    Model { serial: String },
    EndModel,
    Atom(RawAtom),
    /// A record the adapter recognized and deliberately drops.
    Ignored,
    /// A record the adapter could not recognize.
    Other { tag: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No atoms could be loaded ({warnings} records rejected)")]
    EmptyStructure { warnings: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadWarningKind {
    #[error("malformed {field} value '{value}'; atom skipped")]
    MalformedCoordinate { field: &'static str, value: String },
    #[error("malformed {field} value '{value}'")]
    MalformedField { field: &'static str, value: String },
    #[error("duplicate atom {atom} in residue {residue}; atom skipped")]
    DuplicateAtom { residue: ResidueKey, atom: String },
    #[error("unknown record type '{tag}'")]
    UnknownRecord { tag: String },
    #[error("residue {residue} appears after a higher sequence number; reordered")]
    ResidueReordered { residue: ResidueKey },
}

/// A non-fatal problem met while loading, tied to its 1-based record position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {record}: {kind}")]
pub struct LoadWarning {
    pub record: usize,
    pub kind: LoadWarningKind,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub structure: Structure,
    pub warnings: Vec<LoadWarning>,
}

/// Incrementally assembles models, chains and residues in deposition order.
///
/// Residues are keyed by `(chain, number, insertion code)` so atoms of one residue that are
/// interleaved with other records still land in the same residue.
pub struct StructureBuilder<'a> {
    registry: &'a TopologyRegistry,
    models: Vec<Model>,
    current_model: Option<usize>,
    chain_map: HashMap<String, usize>,
    residue_map: HashMap<ResidueKey, (usize, usize)>,
}

impl<'a> StructureBuilder<'a> {
    pub fn new(registry: &'a TopologyRegistry) -> Self {
        Self {
            registry,
            models: Vec::new(),
            current_model: None,
            chain_map: HashMap::new(),
            residue_map: HashMap::new(),
        }
    }

    pub fn start_model(&mut self, index: usize) -> &mut Self {
        self.models.push(Model::new(index));
        self.current_model = Some(self.models.len() - 1);
        self.chain_map.clear();
        self.residue_map.clear();
        self
    }

    fn model_mut(&mut self) -> &mut Model {
        let idx = match self.current_model {
            Some(idx) => idx,
            None => {
                self.start_model(self.models.len() + 1);
                self.models.len() - 1
            }
        };
        &mut self.models[idx]
    }

    /// Adds an atom to the residue `(chain, name, number, insertion code)` of the current
    /// model, creating chain and residue on first sight. Atoms before any
    /// [`start_model`](Self::start_model) call go to model 1.
    pub fn add_atom(
        &mut self,
        chain_id: &str,
        residue_name: &str,
        number: isize,
        insertion_code: Option<char>,
        atom: Atom,
    ) -> Result<&mut Self, LoadWarningKind> {
        let key = ResidueKey::new(chain_id, number, insertion_code);
        let registry = self.registry;
        self.model_mut();

        let chain_idx = match self.chain_map.get(chain_id) {
            Some(&idx) => idx,
            None => {
                let model = self.model_mut();
                model.push_chain(Chain::new(chain_id));
                let idx = model.chains.len() - 1;
                self.chain_map.insert(chain_id.to_string(), idx);
                idx
            }
        };

        let mut reordered = false;
        let (c, r) = match self.residue_map.get(&key) {
            Some(&loc) => loc,
            None => {
                let class = registry.classify(residue_name, atom.is_hetero);
                let residue = Residue::new(residue_name, number, insertion_code, class);
                let chain = &mut self.model_mut().chains[chain_idx];
                let position = chain
                    .residues
                    .iter()
                    .rposition(|existing| (existing.number, existing.insertion_code) <= (number, insertion_code))
                    .map_or(0, |p| p + 1);
                reordered = position < chain.residues.len();
                chain.residues.insert(position, residue);
                if reordered {
                    for loc in self.residue_map.values_mut() {
                        if loc.0 == chain_idx && loc.1 >= position {
                            loc.1 += 1;
                        }
                    }
                }
                self.residue_map.insert(key.clone(), (chain_idx, position));
                (chain_idx, position)
            }
        };

        let residue = &mut self.model_mut().chains[c].residues[r];
        let duplicate = residue
            .atoms
            .iter()
            .any(|a| a.name == atom.name && a.altloc == atom.altloc);
        if duplicate {
            return Err(LoadWarningKind::DuplicateAtom {
                residue: key,
                atom: atom.name,
            });
        }
        residue.push_atom(atom);
        if reordered {
            return Err(LoadWarningKind::ResidueReordered { residue: key });
        }
        Ok(self)
    }

    /// Finishes the structure; models that received no atoms are dropped.
    pub fn build(mut self, metadata: StructureMetadata) -> Result<Structure, ModelError> {
        self.models.retain(|m| m.atom_count() > 0);
        Structure::new(metadata, self.models)
    }
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, LoadWarningKind> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LoadWarningKind::MalformedCoordinate {
            field,
            value: value.to_string(),
        })
}

/// Validates raw records and assembles them into a [`Structure`].
///
/// Individual malformed records become [`LoadWarning`]s and are skipped. The load only fails
/// when no atom survives.
pub fn load(records: &[RawRecord], registry: &TopologyRegistry) -> Result<Loaded, ParseError> {
    let mut builder = StructureBuilder::new(registry);
    let mut metadata = StructureMetadata::default();
    let mut warnings = Vec::new();
    let mut titles: Vec<String> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let record_no = i + 1;
        let mut warn_at = |kind: LoadWarningKind| {
            debug!(record = record_no, "{}", kind);
            warnings.push(LoadWarning {
                record: record_no,
                kind,
            });
        };
        match record {
            RawRecord::Header { entry_id } => {
                let id = entry_id.trim();
                if !id.is_empty() {
                    metadata.entry_id = Some(id.to_string());
                }
            }
            RawRecord::Title(text) => titles.push(text.trim().to_string()),
            RawRecord::Method(text) => metadata.method = Some(text.trim().to_string()),
            RawRecord::Resolution(text) => match text.trim().parse::<f64>() {
                Ok(value) => metadata.resolution = Some(value),
                Err(_) => warn_at(LoadWarningKind::MalformedField {
                    field: "resolution",
                    value: text.clone(),
                }),
            },
            RawRecord::Model { serial } => {
                let index = match serial.trim().parse::<usize>() {
                    Ok(index) => index,
                    Err(_) => {
                        warn_at(LoadWarningKind::MalformedField {
                            field: "model serial",
                            value: serial.clone(),
                        });
                        builder.models.len() + 1
                    }
                };
                builder.start_model(index);
            }
            RawRecord::EndModel => builder.current_model = None,
            RawRecord::Atom(raw) => {
                if let Err(kind) = add_raw_atom(&mut builder, raw) {
                    warn_at(kind);
                }
            }
            RawRecord::Ignored => {}
            RawRecord::Other { tag } => warn_at(LoadWarningKind::UnknownRecord { tag: tag.clone() }),
        }
    }
    if !titles.is_empty() {
        metadata.title = Some(titles.join(" "));
    }

    let structure = builder.build(metadata).map_err(|_| ParseError::EmptyStructure {
        warnings: warnings.len(),
    })?;
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "Records rejected or adjusted during load.");
    }
    Ok(Loaded {
        structure,
        warnings,
    })
}

fn add_raw_atom(builder: &mut StructureBuilder, raw: &RawAtom) -> Result<(), LoadWarningKind> {
    let number = raw
        .residue_number
        .trim()
        .parse::<isize>()
        .map_err(|_| LoadWarningKind::MalformedCoordinate {
            field: "residue number",
            value: raw.residue_number.clone(),
        })?;
    let position = Point3::new(
        parse_coordinate("x", &raw.x)?,
        parse_coordinate("y", &raw.y)?,
        parse_coordinate("z", &raw.z)?,
    );
    let residue_name = raw.residue_name.trim();
    let name = raw.name.trim();
    let element = match raw.element.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => e.to_string(),
        _ => infer_element(name, residue_name),
    };

    let mut atom = Atom::new(name, &element, position);
    atom.is_hetero = raw.hetero;
    atom.altloc = raw.altloc.filter(|c| !c.is_whitespace());
    // Missing or unreadable occupancy is treated as full; the site is still usable.
    atom.occupancy = raw
        .occupancy
        .as_deref()
        .and_then(|o| o.trim().parse::<f64>().ok())
        .filter(|o| o.is_finite())
        .unwrap_or(1.0);
    atom.b_factor = raw
        .b_factor
        .as_deref()
        .and_then(|b| b.trim().parse::<f64>().ok());

    builder.add_atom(
        raw.chain.trim(),
        residue_name,
        number,
        raw.insertion_code.filter(|c| !c.is_whitespace()),
        atom,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::residue::ResidueClass;

    fn atom(chain: &str, res: &str, num: &str, name: &str, xyz: [&str; 3]) -> RawRecord {
        RawRecord::Atom(RawAtom {
            hetero: false,
            name: name.into(),
            residue_name: res.into(),
            chain: chain.into(),
            residue_number: num.into(),
            x: xyz[0].into(),
            y: xyz[1].into(),
            z: xyz[2].into(),
            ..Default::default()
        })
    }

    fn registry() -> TopologyRegistry {
        TopologyRegistry::builtin().unwrap()
    }

    #[test]
    fn load_builds_chains_residues_and_metadata() {
        let records = vec![
            RawRecord::Header { entry_id: "1ABC".into() },
            RawRecord::Title("A SMALL".into()),
            RawRecord::Title("PEPTIDE".into()),
            RawRecord::Resolution("1.80".into()),
            atom("A", "ALA", "1", "N", ["0", "0", "0"]),
            atom("A", "ALA", "1", "CA", ["1.46", "0", "0"]),
            atom("A", "GLY", "2", "N", ["3", "0", "0"]),
            atom("B", "SER", "1", "N", ["9", "0", "0"]),
        ];
        let loaded = load(&records, &registry()).unwrap();
        assert!(loaded.warnings.is_empty());
        let structure = loaded.structure;
        assert_eq!(structure.metadata().entry_id.as_deref(), Some("1ABC"));
        assert_eq!(structure.metadata().title.as_deref(), Some("A SMALL PEPTIDE"));
        assert_eq!(structure.metadata().resolution, Some(1.8));
        let model = structure.primary_model();
        assert_eq!(model.index, 1);
        assert_eq!(model.chains().len(), 2);
        assert_eq!(model.chains()[0].residues().len(), 2);
        assert_eq!(model.chains()[0].residues()[0].class, ResidueClass::AminoAcid);
        assert_eq!(model.chains()[0].residues()[0].atoms()[1].element, "C");
    }

    #[test]
    fn malformed_atoms_are_skipped_with_warnings() {
        let records = vec![
            atom("A", "ALA", "1", "N", ["0", "0", "0"]),
            atom("A", "ALA", "1", "CA", ["1.4x", "0", "0"]),
            atom("A", "ALA", "1", "N", ["0", "0", "1"]),
            RawRecord::Other { tag: "FOOBAR".into() },
        ];
        let loaded = load(&records, &registry()).unwrap();
        assert_eq!(loaded.structure.atom_count(), 1);
        let kinds: Vec<_> = loaded.warnings.iter().map(|w| (w.record, &w.kind)).collect();
        assert!(matches!(kinds[0], (2, LoadWarningKind::MalformedCoordinate { field: "x", .. })));
        assert!(matches!(kinds[1], (3, LoadWarningKind::DuplicateAtom { .. })));
        assert!(matches!(kinds[2], (4, LoadWarningKind::UnknownRecord { .. })));
    }

    #[test]
    fn altloc_copies_are_not_duplicates() {
        let mut a = atom("A", "SER", "5", "OG", ["0", "0", "0"]);
        let mut b = atom("A", "SER", "5", "OG", ["0.5", "0", "0"]);
        if let (RawRecord::Atom(a), RawRecord::Atom(b)) = (&mut a, &mut b) {
            a.altloc = Some('A');
            a.occupancy = Some("0.60".into());
            b.altloc = Some('B');
            b.occupancy = Some("0.40".into());
        }
        let loaded = load(&[a, b], &registry()).unwrap();
        assert!(loaded.warnings.is_empty());
        let residue = &loaded.structure.primary_model().chains()[0].residues()[0];
        assert_eq!(residue.atoms().len(), 2);
        assert_eq!(residue.atoms()[1].occupancy, 0.4);
    }

    #[test]
    fn all_rejected_atoms_is_fatal() {
        let records = vec![atom("A", "ALA", "1", "N", ["nan", "0", "0"])];
        assert!(matches!(
            load(&records, &registry()),
            Err(ParseError::EmptyStructure { warnings: 1 })
        ));
        assert!(matches!(load(&[], &registry()), Err(ParseError::EmptyStructure { warnings: 0 })));
    }

    #[test]
    fn models_are_kept_apart() {
        let records = vec![
            RawRecord::Model { serial: "1".into() },
            atom("A", "ALA", "1", "CA", ["0", "0", "0"]),
            RawRecord::EndModel,
            RawRecord::Model { serial: "2".into() },
            atom("A", "ALA", "1", "CA", ["1", "0", "0"]),
            RawRecord::EndModel,
        ];
        let structure = load(&records, &registry()).unwrap().structure;
        assert_eq!(structure.models().len(), 2);
        assert_eq!(structure.model(2).unwrap().atom_count(), 1);
    }

    #[test]
    fn out_of_order_residues_are_reinserted_in_sequence() {
        let records = vec![
            atom("A", "ALA", "2", "CA", ["0", "0", "0"]),
            atom("A", "GLY", "1", "CA", ["1", "0", "0"]),
            atom("A", "ALA", "2", "CB", ["0", "1", "0"]),
        ];
        let loaded = load(&records, &registry()).unwrap();
        assert!(matches!(loaded.warnings[0].kind, LoadWarningKind::ResidueReordered { .. }));
        let chain = &loaded.structure.primary_model().chains()[0];
        assert_eq!(chain.residues()[0].number, 1);
        assert_eq!(chain.residues()[1].atoms().len(), 2);
    }

    #[test]
    fn missing_element_is_inferred() {
        let mut zn = atom("Z", "ZN", "1", "ZN", ["0", "0", "0"]);
        if let RawRecord::Atom(a) = &mut zn {
            a.hetero = true;
        }
        let structure = load(&[zn], &registry()).unwrap().structure;
        let residue = &structure.primary_model().chains()[0].residues()[0];
        assert_eq!(residue.class, ResidueClass::Ion);
        assert_eq!(residue.atoms()[0].element, "ZN");
    }
}
