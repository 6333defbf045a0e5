use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;

pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let models = ctx.structure.models();
    vec![Finding::ModelCount {
        count: models.len(),
        indices: models.iter().map(|m| m.index).collect(),
    }]
}
