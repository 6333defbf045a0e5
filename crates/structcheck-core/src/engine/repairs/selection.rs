use super::{RepairContext, StageOutcome};
use crate::core::models::structure::Structure;
use crate::engine::error::EngineError;
use tracing::info;

pub fn select_model(structure: &Structure, ctx: &RepairContext) -> Result<StageOutcome, EngineError> {
    let wanted = ctx.config.model;
    let models = structure.models();
    if models.len() == 1 && models[0].index == wanted {
        return Ok(StageOutcome::unchanged());
    }
    let selected = structure.select_model(wanted)?;
    info!(model = wanted, discarded = models.len() - 1, "Selected model.");
    Ok(StageOutcome::changed(selected))
}

pub fn select_chains(structure: &Structure, ctx: &RepairContext) -> Result<StageOutcome, EngineError> {
    let Some(wanted) = &ctx.config.chains else {
        return Ok(StageOutcome::unchanged());
    };
    let already = structure
        .models()
        .iter()
        .all(|m| m.chains().iter().all(|c| wanted.contains(&c.id)));
    if already {
        return Ok(StageOutcome::unchanged());
    }
    let selected = structure.select_chains(wanted)?;
    info!(chains = ?wanted, "Selected chains.");
    Ok(StageOutcome::changed(selected))
}
