use super::ids::ResidueKey;
use super::model::Model;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Structure contains no models")]
    NoModels,
    #[error("Model {requested} not found (available: {available:?})")]
    ModelNotFound {
        requested: usize,
        available: Vec<usize>,
    },
    #[error("None of the requested chains {requested:?} exist (available: {available:?})")]
    ChainsNotFound {
        requested: Vec<String>,
        available: Vec<String>,
    },
}

/// Global metadata of a deposited entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureMetadata {
    pub entry_id: Option<String>,
    pub method: Option<String>,
    pub resolution: Option<f64>,
    pub title: Option<String>,
}

/// A disulfide bridge accepted by the repair engine, recorded as a bonded relation between
/// two cysteine residues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DisulfideLink {
    pub first: ResidueKey,
    pub second: ResidueKey,
}

impl DisulfideLink {
    pub fn new(a: ResidueKey, b: ResidueKey) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn involves(&self, key: &ResidueKey) -> bool {
        &self.first == key || &self.second == key
    }
}

/// One immutable revision of a structure.
///
/// Accessors only hand out shared references. Every modification goes through an explicit
/// operation that returns a new `Structure`; [`Structure::rebuild`] additionally advances the
/// revision counter so reports stay traceable to the revision they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    metadata: StructureMetadata,
    models: Vec<Model>,
    disulfides: Vec<DisulfideLink>,
    revision: u32,
}

impl Structure {
    pub fn new(metadata: StructureMetadata, models: Vec<Model>) -> Result<Self, ModelError> {
        if models.is_empty() {
            return Err(ModelError::NoModels);
        }
        Ok(Self {
            metadata,
            models,
            disulfides: Vec::new(),
            revision: 0,
        })
    }

    pub fn metadata(&self) -> &StructureMetadata {
        &self.metadata
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.iter().find(|m| m.index == index)
    }

    /// The model that checks operate on: the first one in deposition order.
    pub fn primary_model(&self) -> &Model {
        &self.models[0]
    }

    pub fn disulfides(&self) -> &[DisulfideLink] {
        &self.disulfides
    }

    pub fn atom_count(&self) -> usize {
        self.models.iter().map(Model::atom_count).sum()
    }

    /// Returns a single-model structure holding the model with the given 1-based index.
    pub fn select_model(&self, index: usize) -> Result<Structure, ModelError> {
        let model = self
            .model(index)
            .ok_or_else(|| ModelError::ModelNotFound {
                requested: index,
                available: self.models.iter().map(|m| m.index).collect(),
            })?
            .clone();
        Ok(Structure {
            metadata: self.metadata.clone(),
            models: vec![model],
            disulfides: self.disulfides.clone(),
            revision: self.revision,
        })
    }

    /// Returns a sub-structure restricted to the named chains, in every model.
    pub fn select_chains<S: AsRef<str>>(&self, ids: &[S]) -> Result<Structure, ModelError> {
        let wanted: BTreeSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let mut models = self.models.clone();
        for model in &mut models {
            model.chains.retain(|c| wanted.contains(c.id.as_str()));
        }
        if models.iter().all(|m| m.chains.is_empty()) {
            let available: BTreeSet<String> = self
                .models
                .iter()
                .flat_map(|m| m.chains.iter().map(|c| c.id.clone()))
                .collect();
            return Err(ModelError::ChainsNotFound {
                requested: wanted.into_iter().map(str::to_string).collect(),
                available: available.into_iter().collect(),
            });
        }
        let disulfides = self
            .disulfides
            .iter()
            .filter(|l| wanted.contains(l.first.chain.as_str()) && wanted.contains(l.second.chain.as_str()))
            .cloned()
            .collect();
        Ok(Structure {
            metadata: self.metadata.clone(),
            models,
            disulfides,
            revision: self.revision,
        })
    }

    /// Produces the next revision by applying `edit` to a copy of every model.
    ///
    /// Residues and chains emptied by the edit are pruned.
    pub fn rebuild<F>(&self, mut edit: F) -> Structure
    where
        F: FnMut(&mut Model),
    {
        let mut next = self.clone();
        for model in &mut next.models {
            edit(model);
            model.prune_empty();
        }
        next.revision += 1;
        next
    }

    /// Produces the next revision without touching the coordinates.
    pub fn next_revision(&self) -> Structure {
        self.rebuild(|_| {})
    }

    /// Replaces the recorded disulfide relations of a freshly built revision.
    pub fn with_disulfides(mut self, links: Vec<DisulfideLink>) -> Structure {
        let mut links = links;
        links.sort();
        links.dedup();
        self.disulfides = links;
        self
    }

    pub(crate) fn with_revision(mut self, revision: u32) -> Structure {
        self.revision = revision;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::Chain;
    use crate::core::models::residue::{Residue, ResidueClass};
    use nalgebra::Point3;

    fn two_model_structure() -> Structure {
        let mut models = Vec::new();
        for index in 1..=2 {
            let mut model = Model::new(index);
            for id in ["A", "B"] {
                let mut chain = Chain::new(id);
                let mut residue = Residue::new("ALA", 1, None, ResidueClass::AminoAcid);
                residue.push_atom(Atom::new("CA", "C", Point3::new(index as f64, 0.0, 0.0)));
                chain.push_residue(residue);
                model.push_chain(chain);
            }
            models.push(model);
        }
        Structure::new(StructureMetadata::default(), models).unwrap()
    }

    #[test]
    fn empty_model_list_is_rejected() {
        assert_eq!(
            Structure::new(StructureMetadata::default(), Vec::new()),
            Err(ModelError::NoModels)
        );
    }

    #[test]
    fn select_model_returns_single_model() {
        let structure = two_model_structure();
        let selected = structure.select_model(2).unwrap();
        assert_eq!(selected.models().len(), 1);
        assert_eq!(selected.primary_model().index, 2);
        assert_eq!(selected.revision(), structure.revision());
    }

    #[test]
    fn select_model_out_of_range_is_not_found() {
        let err = two_model_structure().select_model(3).unwrap_err();
        assert_eq!(
            err,
            ModelError::ModelNotFound {
                requested: 3,
                available: vec![1, 2]
            }
        );
    }

    #[test]
    fn select_chains_keeps_named_chains_only() {
        let selected = two_model_structure().select_chains(&["B"]).unwrap();
        assert!(selected.models().iter().all(|m| m.chains().len() == 1));
        assert_eq!(selected.primary_model().chains()[0].id, "B");
    }

    #[test]
    fn select_chains_without_match_is_not_found() {
        let err = two_model_structure().select_chains(&["Z"]).unwrap_err();
        assert!(matches!(err, ModelError::ChainsNotFound { .. }));
    }

    #[test]
    fn rebuild_advances_revision_and_leaves_source_untouched() {
        let structure = two_model_structure();
        let rebuilt = structure.rebuild(|model| model.chains_mut().truncate(1));
        assert_eq!(rebuilt.revision(), structure.revision() + 1);
        assert_eq!(rebuilt.primary_model().chains().len(), 1);
        assert_eq!(structure.primary_model().chains().len(), 2);
    }

    #[test]
    fn disulfide_links_are_normalized() {
        let a = ResidueKey::new("A", 30, None);
        let b = ResidueKey::new("A", 5, None);
        let link = DisulfideLink::new(a.clone(), b.clone());
        assert_eq!(link.first, b);
        assert!(link.involves(&a));
        let structure = two_model_structure().with_disulfides(vec![link.clone(), link]);
        assert_eq!(structure.disulfides().len(), 1);
    }
}
