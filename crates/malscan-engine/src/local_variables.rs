use malscan_core::{Method, ScanFinding};
use malscan_rules::{Rule, RuleRegistry};

const RULE_ID: &str = "SuspiciousLocalVariableRule";
const MIN_MATCHING_LOCALS: usize = 2;

/// Types whose repeated presence among a method's locals suggests staged
/// payload buffering or process manipulation (byte buffers for a decoded
/// payload, a `ProcessStartInfo` built up across several locals, and so on).
const WATCHED_TYPES: &[&str] = &[
    "System.Byte[]",
    "System.Diagnostics.ProcessStartInfo",
    "System.Reflection.Assembly",
    "System.Security.Cryptography.ICryptoTransform",
];

/// Whole-method structural check over `Method::locals` (§4.3, locals are
/// not call-site-shaped so this runs outside the instruction loop). Emits
/// at most one Low-severity finding per method.
pub fn analyze_locals(method: &Method, registry: &RuleRegistry) -> Option<ScanFinding> {
    let matching = method.locals.iter().filter(|l| WATCHED_TYPES.contains(&l.type_name.as_str())).count();
    if matching < MIN_MATCHING_LOCALS {
        return None;
    }

    let rule = registry.by_id(RULE_ID)?;
    Some(malscan_rules::rule::finding(
        rule,
        format!("{}:0", method.key),
        rule.description(),
        None,
    ))
}

/// Whether this method's locals trip the watchlist, independent of whether
/// a finding was actually emitted (used to populate the signal tracker).
pub fn has_suspicious_locals(method: &Method) -> bool {
    method.locals.iter().filter(|l| WATCHED_TYPES.contains(&l.type_name.as_str())).count() >= MIN_MATCHING_LOCALS
}

#[cfg(test)]
mod tests {
    use super::*;
    use malscan_core::{LocalVariable, MethodKey, MethodSignature};

    fn method_with_locals(types: &[&str]) -> Method {
        Method {
            key: MethodKey::new("Game.Loader", "Stage"),
            name: "Stage".into(),
            declaring_type: "Game.Loader".into(),
            signature: MethodSignature::default(),
            instructions: Vec::new(),
            exception_handlers: Vec::new(),
            locals: types
                .iter()
                .enumerate()
                .map(|(i, t)| LocalVariable { index: i as u32, type_name: t.to_string() })
                .collect(),
            pinvoke: None,
        }
    }

    #[test]
    fn below_threshold_yields_no_finding() {
        let method = method_with_locals(&["System.Byte[]", "System.String"]);
        let registry = RuleRegistry::with_defaults();
        assert!(analyze_locals(&method, &registry).is_none());
    }

    #[test]
    fn two_watched_types_trips_the_rule() {
        let method = method_with_locals(&["System.Byte[]", "System.Diagnostics.ProcessStartInfo", "System.String"]);
        let registry = RuleRegistry::with_defaults();
        let finding = analyze_locals(&method, &registry).expect("expected a finding");
        assert_eq!(finding.rule_id, RULE_ID);
        assert_eq!(finding.severity, malscan_core::Severity::Low);
    }

    #[test]
    fn has_suspicious_locals_matches_analyze_locals() {
        let tripped = method_with_locals(&["System.Byte[]", "System.Reflection.Assembly"]);
        let clean = method_with_locals(&["System.String"]);
        assert!(has_suspicious_locals(&tripped));
        assert!(!has_suspicious_locals(&clean));
    }
}
