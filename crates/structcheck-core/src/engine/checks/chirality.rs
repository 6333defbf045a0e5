use crate::core::models::residue::Residue;
use crate::core::topology::registry::Stereocenter;
use crate::core::utils::geometry::signed_volume;
use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;

/// Signed volume of the substituents around a stereocenter, or `None` when any of the four
/// atoms is absent.
pub(crate) fn stereocenter_volume(residue: &Residue, center: &Stereocenter) -> Option<f64> {
    let position = |name: &str| residue.atom(name).map(|a| a.position);
    let [s1, s2, s3] = &center.substituents;
    Some(signed_volume(
        &position(&center.center)?,
        &position(s1)?,
        &position(s2)?,
        &position(s3)?,
    ))
}

pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (chain, residue) in ctx.model.residues() {
        let Some(template) = ctx.registry.get(&residue.name) else {
            continue;
        };
        for center in &template.stereocenters {
            let Some(volume) = stereocenter_volume(residue, center) else {
                continue;
            };
            if !center.sign.matches(volume) {
                findings.push(Finding::ChiralityViolation {
                    residue: residue.key(&chain.id),
                    residue_name: residue.name.clone(),
                    center: center.center.clone(),
                    signed_volume: volume,
                    expected: center.sign,
                });
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ResidueKey;
    use crate::core::topology::registry::{Handedness, TopologyRegistry};
    use crate::engine::config::CheckConfig;
    use crate::test_utils::{ideal_peptide_structure, invert_stereocenters};

    #[test]
    fn ideal_threonine_and_isoleucine_match_reference() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "TIT")]);
        let ctx = CheckContext::new(&structure, &registry, &config);
        assert!(run(&ctx).is_empty());
    }

    #[test]
    fn inverted_center_is_flagged_with_opposite_sign() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "TIT")]);
        let structure = invert_stereocenters(&registry, &structure, &[ResidueKey::new("A", 2, None)]);
        let ctx = CheckContext::new(&structure, &registry, &config);
        let findings = run(&ctx);
        assert_eq!(findings.len(), 1);
        let Finding::ChiralityViolation {
            residue,
            center,
            signed_volume,
            expected,
            ..
        } = &findings[0]
        else {
            panic!("unexpected finding {:?}", findings[0]);
        };
        assert_eq!(residue.number, 2);
        assert_eq!(center, "CB");
        assert_eq!(*expected, Handedness::Positive);
        assert!(*signed_volume < 0.0);
    }
}
