use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Per-method (or, aggregated, per-type) mutable signal set accumulated while
/// walking a method's instructions. `TypeSignals` reuses this exact shape as
/// the union of its methods' signals for cross-method reasoning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodSignals {
    pub triggered_rules: HashSet<String>,
    pub file_write: bool,
    pub env_modified: bool,
    pub sensitive_folder: bool,
    pub suspicious_local_variables: bool,
}

pub type TypeSignals = MethodSignals;

impl MethodSignals {
    pub fn signal_count(&self) -> usize {
        let mut count = self.triggered_rules.len();
        if self.file_write {
            count += 1;
        }
        if self.env_modified {
            count += 1;
        }
        if self.sensitive_folder {
            count += 1;
        }
        if self.suspicious_local_variables {
            count += 1;
        }
        count
    }

    pub fn mark_triggered(&mut self, rule_id: &str) {
        self.triggered_rules.insert(rule_id.to_string());
    }

    pub fn has_triggered(&self, rule_id: &str) -> bool {
        self.triggered_rules.contains(rule_id)
    }

    pub fn has_triggered_rule_other_than(&self, rule_id: &str) -> bool {
        self.triggered_rules.iter().any(|id| id != rule_id)
    }

    pub fn has_any_triggered(&self, rule_ids: &[&str]) -> bool {
        rule_ids.iter().any(|id| self.triggered_rules.contains(*id))
    }

    /// Merge another method's signals into this (type-level) aggregate.
    pub fn union_with(&mut self, other: &MethodSignals) {
        self.triggered_rules
            .extend(other.triggered_rules.iter().cloned());
        self.file_write |= other.file_write;
        self.env_modified |= other.env_modified;
        self.sensitive_folder |= other.sensitive_folder;
        self.suspicious_local_variables |= other.suspicious_local_variables;
    }
}
