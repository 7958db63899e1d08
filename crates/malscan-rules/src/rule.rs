use malscan_core::{DeveloperGuidance, MalscanError, MethodRef, ScanFinding, Severity};

use crate::context::{ContextualContext, LiteralContext, SuppressionContext};

/// A single atomic detector. Every hook defaults to an empty/false result so
/// a concrete rule only needs to implement the hooks it actually uses —
/// this is the "narrow shape, default-empty trait" alternative to an
/// inheritance hierarchy (see design notes on deep inheritance).
///
/// Implementations must be side-effect free: all mutation of scan state
/// happens through the values a hook returns, never through interior
/// mutability on the rule itself (rules are shared, immutable, and
/// lock-free across concurrently scanned assemblies).
///
/// The per-instruction hooks return `Result` so a rule can report a
/// `MalscanError::RuleError` instead of panicking or silently fabricating a
/// result; the instruction analyzer catches it, logs it, and moves on to the
/// next rule or instruction (§7: rule failures are recovered locally, never
/// fatal).
pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;
    fn severity(&self) -> Severity;
    fn description(&self) -> String;

    fn requires_companion(&self) -> bool {
        false
    }

    fn developer_guidance(&self) -> Option<DeveloperGuidance> {
        None
    }

    /// Single-call predicate over a callee's signature alone (no surrounding
    /// context). Used by the instruction analyzer's declaration-time dispatch
    /// (§4.3 step 5) and by the P/Invoke scanner (§4.4).
    fn is_suspicious(&self, _callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(false)
    }

    /// Inspects the call's prologue within a small instruction window.
    fn analyze_contextual_pattern(&self, _ctx: &ContextualContext) -> Result<Vec<ScanFinding>, MalscanError> {
        Ok(Vec::new())
    }

    /// Invoked for every `ldstr` operand in the method.
    fn analyze_string_literal(&self, _ctx: &LiteralContext) -> Result<Vec<ScanFinding>, MalscanError> {
        Ok(Vec::new())
    }

    /// Contextual suppression veto (§4.7). Only consulted for rules whose
    /// `is_suspicious` hook matched.
    fn should_suppress_finding(&self, _ctx: &SuppressionContext) -> Result<bool, MalscanError> {
        Ok(false)
    }
}

/// Builds a `MalscanError::RuleError` for a rule that failed while
/// evaluating one instruction; callers log it and skip the instruction.
pub fn rule_error(rule_id: &str, message: impl Into<String>) -> MalscanError {
    MalscanError::RuleError { rule_id: rule_id.to_string(), message: message.into() }
}

pub(crate) fn guidance(
    remediation: &str,
    doc_url: Option<&str>,
    alternative_apis: &[&str],
) -> DeveloperGuidance {
    DeveloperGuidance {
        remediation: remediation.to_string(),
        doc_url: doc_url.map(|s| s.to_string()),
        alternative_apis: alternative_apis.iter().map(|s| s.to_string()).collect(),
        is_remediable: true,
    }
}

pub fn finding(
    rule: &dyn Rule,
    location: String,
    description: String,
    snippet: Option<String>,
) -> ScanFinding {
    ScanFinding {
        rule_id: rule.id().to_string(),
        location,
        description,
        severity: rule.severity(),
        snippet,
        call_chain: None,
        data_flow_chain: None,
        bypass_companion: false,
        risk_score: None,
        developer_guidance: rule.developer_guidance(),
    }
}
