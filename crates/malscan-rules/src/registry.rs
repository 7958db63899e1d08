use std::sync::Arc;

use crate::rule::Rule;
use crate::rules::*;

/// An immutable, ordered collection of rules. Lookups are linear — the
/// registry holds on the order of twenty rules, so a `HashMap` would add
/// complexity without a measurable win — and the whole thing is handed
/// around as `Arc<RuleRegistry>` so every concurrently scanned assembly
/// shares one instance.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// The full default rule set, in a fixed, stable order.
    pub fn with_defaults() -> Arc<Self> {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(Base64Rule),
            Box::new(ProcessStartRule),
            Box::new(Shell32Rule),
            Box::new(AssemblyDynamicLoadRule),
            Box::new(ByteArrayManipulationRule),
            Box::new(DllImportRule),
            Box::new(RegistryRule),
            Box::new(EncodedStringLiteralRule),
            Box::new(ReflectionRule),
            Box::new(EnvironmentPathRule),
            Box::new(EncodedStringPipelineRule),
            Box::new(EncodedBlobSplittingRule),
            Box::new(ComReflectionAttackRule),
            Box::new(DataExfiltrationRule),
            Box::new(DataInfiltrationRule),
            Box::new(PersistenceRule),
            Box::new(HexStringRule),
            Box::new(SuspiciousLocalVariableRule),
        ];
        Arc::new(Self::new(rules))
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn by_id(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_rule_ids_are_unique() {
        let registry = RuleRegistry::with_defaults();
        let ids: HashSet<&str> = registry.rules().iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), registry.len());
    }

    #[test]
    fn by_id_finds_a_known_rule() {
        let registry = RuleRegistry::with_defaults();
        assert!(registry.by_id("ProcessStartRule").is_some());
        assert!(registry.by_id("NotARealRule").is_none());
    }

    #[test]
    fn strong_companion_rule_ids_all_resolve() {
        let registry = RuleRegistry::with_defaults();
        for id in STRONG_COMPANION_RULE_IDS {
            assert!(registry.by_id(id).is_some(), "missing rule referenced by companion list: {id}");
        }
    }
}
