//! Sequential repair stages.
//!
//! Each stage reads the current structure revision, recomputes the findings it consumes and
//! returns a [`StageOutcome`]. A stage whose findings are already empty returns no new
//! structure, so running it again changes nothing.

pub mod altloc;
pub mod amide;
pub mod backbone;
pub mod chirality;
pub mod disulfides;
pub mod minimize;
pub mod removal;
pub mod renumber;
pub mod selection;
pub mod sidechains;

use super::collaborators::Collaborators;
use super::config::{CheckConfig, RepairConfig};
use super::context::CheckContext;
use super::findings::RepairNote;
use crate::core::models::ids::ResidueKey;
use crate::core::models::structure::Structure;
use crate::core::topology::registry::TopologyRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    ModelSelection,
    ChainSelection,
    AltlocResolution,
    DisulfideMarking,
    HeteroRemoval,
    HydrogenRemoval,
    WaterRemoval,
    AmideFix,
    ChiralityFix,
    SidechainCompletion,
    BackboneCompletion,
    ClashRelief,
    Renumbering,
}

impl RepairStage {
    pub const ALL: [RepairStage; 13] = [
        RepairStage::ModelSelection,
        RepairStage::ChainSelection,
        RepairStage::AltlocResolution,
        RepairStage::DisulfideMarking,
        RepairStage::HeteroRemoval,
        RepairStage::HydrogenRemoval,
        RepairStage::WaterRemoval,
        RepairStage::AmideFix,
        RepairStage::ChiralityFix,
        RepairStage::SidechainCompletion,
        RepairStage::BackboneCompletion,
        RepairStage::ClashRelief,
        RepairStage::Renumbering,
    ];

    /// Stages repeated by iterative repair cycles.
    pub const GEOMETRIC: [RepairStage; 5] = [
        RepairStage::AmideFix,
        RepairStage::ChiralityFix,
        RepairStage::SidechainCompletion,
        RepairStage::BackboneCompletion,
        RepairStage::ClashRelief,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RepairStage::ModelSelection => "model_selection",
            RepairStage::ChainSelection => "chain_selection",
            RepairStage::AltlocResolution => "altloc_resolution",
            RepairStage::DisulfideMarking => "disulfide_marking",
            RepairStage::HeteroRemoval => "hetero_removal",
            RepairStage::HydrogenRemoval => "hydrogen_removal",
            RepairStage::WaterRemoval => "water_removal",
            RepairStage::AmideFix => "amide_fix",
            RepairStage::ChiralityFix => "chirality_fix",
            RepairStage::SidechainCompletion => "sidechain_completion",
            RepairStage::BackboneCompletion => "backbone_completion",
            RepairStage::ClashRelief => "clash_relief",
            RepairStage::Renumbering => "renumbering",
        }
    }
}

impl fmt::Display for RepairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared, read-only inputs of every stage.
pub struct RepairContext<'a> {
    pub registry: &'a TopologyRegistry,
    pub checks: &'a CheckConfig,
    pub config: &'a RepairConfig,
    pub collaborators: &'a Collaborators,
}

impl<'a> RepairContext<'a> {
    pub fn analyze<'s>(&'s self, structure: &'s Structure) -> CheckContext<'s> {
        CheckContext::new(structure, self.registry, self.checks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    /// The revised structure, or `None` when the stage had nothing to do.
    pub structure: Option<Structure>,
    pub notes: Vec<RepairNote>,
    /// Residue identities changed by the stage.
    pub renamed: BTreeMap<ResidueKey, ResidueKey>,
}

impl StageOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed(structure: Structure) -> Self {
        Self {
            structure: Some(structure),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: Vec<RepairNote>) -> Self {
        self.notes = notes;
        self
    }

    pub fn is_changed(&self) -> bool {
        self.structure.is_some()
    }
}

pub fn apply(
    stage: RepairStage,
    structure: &Structure,
    ctx: &RepairContext,
) -> Result<StageOutcome, super::error::EngineError> {
    match stage {
        RepairStage::ModelSelection => selection::select_model(structure, ctx),
        RepairStage::ChainSelection => selection::select_chains(structure, ctx),
        RepairStage::AltlocResolution => Ok(altloc::resolve(structure, ctx)),
        RepairStage::DisulfideMarking => Ok(disulfides::mark(structure, ctx)),
        RepairStage::HeteroRemoval => Ok(removal::remove_hetero(structure, ctx)),
        RepairStage::HydrogenRemoval => Ok(removal::remove_hydrogens(structure, ctx)),
        RepairStage::WaterRemoval => Ok(removal::remove_water(structure, ctx)),
        RepairStage::AmideFix => Ok(amide::fix(structure, ctx)),
        RepairStage::ChiralityFix => Ok(chirality::fix(structure, ctx)),
        RepairStage::SidechainCompletion => Ok(sidechains::complete(structure, ctx)),
        RepairStage::BackboneCompletion => Ok(backbone::complete(structure, ctx)),
        RepairStage::ClashRelief => Ok(minimize::relieve(structure, ctx)),
        RepairStage::Renumbering => Ok(renumber::renumber(structure, ctx)),
    }
}
