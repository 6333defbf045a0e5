use crate::engine::context::CheckContext;
use crate::engine::findings::Finding;
use tracing::debug;

/// Classifies every chain of the primary model and flags chains without an identifier.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let threshold = ctx.config.chain_type_threshold;
    let mut findings = Vec::new();
    for (position, chain) in ctx.model.chains().iter().enumerate() {
        let chain_type = chain.classify(threshold);
        debug!(chain = %chain.id, %chain_type, "Classified chain.");
        findings.push(Finding::ChainSummary {
            chain: chain.id.clone(),
            chain_type,
            residues: chain.residues().len(),
            composition: chain.composition(),
        });
        if chain.is_unlabelled() {
            findings.push(Finding::UnlabelledChain {
                position: position + 1,
                residues: chain.residues().len(),
            });
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::chain::ChainType;
    use crate::core::topology::registry::TopologyRegistry;
    use crate::engine::config::CheckConfig;
    use crate::test_utils::ideal_peptide_structure;

    #[test]
    fn protein_chains_are_summarized_and_blank_ids_flagged() {
        let registry = TopologyRegistry::builtin().unwrap();
        let config = CheckConfig::default();
        let structure = ideal_peptide_structure(&registry, &[("A", "GSA"), (" ", "KK")]);
        let ctx = CheckContext::new(&structure, &registry, &config);
        let findings = run(&ctx);
        assert_eq!(findings.len(), 3);
        assert!(matches!(
            &findings[0],
            Finding::ChainSummary { chain, chain_type: ChainType::Protein, residues: 3, .. } if chain == "A"
        ));
        assert_eq!(
            findings[2],
            Finding::UnlabelledChain {
                position: 2,
                residues: 2
            }
        );
        assert_eq!(findings.iter().filter(|f| f.is_defect()).count(), 1);
    }
}
