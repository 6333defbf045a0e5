use crate::core::models::residue::ResidueClass;
use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;

pub fn run_hydrogens(ctx: &CheckContext) -> Vec<Finding> {
    let count = (0..ctx.sites.len()).filter(|&i| ctx.atom(i).is_hydrogen()).count();
    vec![Finding::HydrogenCount { count }]
}

pub fn run_water(ctx: &CheckContext) -> Vec<Finding> {
    let count = ctx
        .model
        .residues()
        .filter(|(_, residue)| residue.class == ResidueClass::Water)
        .count();
    vec![Finding::WaterCount { count }]
}
