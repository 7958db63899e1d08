use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use malscan_core::{MethodKey, MethodSignals};
use rustc_hash::FxHasher;

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Tracks per-method and per-type signals accumulated across the
/// instruction analysis pass. Types aggregate their methods' signals by
/// union (§4.2) so a rule triggered in one method of a type is visible to
/// the suppression hook running against another method of that same type.
#[derive(Default)]
pub struct SignalTracker {
    method_signals: FxHashMap<MethodKey, MethodSignals>,
    type_signals: FxHashMap<String, MethodSignals>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_signals_mut(&mut self, key: &MethodKey) -> &mut MethodSignals {
        self.method_signals.entry(key.clone()).or_default()
    }

    pub fn method_signals(&self, key: &MethodKey) -> MethodSignals {
        self.method_signals.get(key).cloned().unwrap_or_default()
    }

    /// Recomputes every type's aggregated signals as the union of its
    /// methods' signals. Called after each method of a type completes, so a
    /// method declared later in a type can retroactively legitimize an
    /// earlier suspicious call in a sibling method of the same type (§4.2),
    /// not just across separate types.
    pub fn recompute_type_signals(&mut self, declaring_type: &str, method_keys: &[MethodKey]) {
        let mut aggregate = MethodSignals::default();
        for key in method_keys {
            if let Some(signals) = self.method_signals.get(key) {
                aggregate.union_with(signals);
            }
        }
        self.type_signals.insert(declaring_type.to_string(), aggregate);
    }

    pub fn type_signals(&self, declaring_type: &str) -> MethodSignals {
        self.type_signals.get(declaring_type).cloned().unwrap_or_default()
    }
}
