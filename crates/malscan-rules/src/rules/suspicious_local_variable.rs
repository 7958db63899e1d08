use malscan_core::Severity;

use crate::rule::{guidance, Rule};

/// Carries id/severity/guidance metadata only. The actual detection — a
/// method declaring an unusually large number of locals typed
/// `System.Byte[]`/`System.Diagnostics.ProcessStartInfo` — is a
/// whole-method structural check performed by the instruction analyzer
/// directly against `Method::locals`, not a per-call-site hook, so every
/// `Rule` trait hook here stays at its default.
pub struct SuspiciousLocalVariableRule;

impl Rule for SuspiciousLocalVariableRule {
    fn id(&self) -> &'static str {
        "SuspiciousLocalVariableRule"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn description(&self) -> String {
        "Declares local variables whose types suggest staged process manipulation or payload \
         buffering"
            .into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "No action needed on its own; review alongside any companion finding in the same \
             method.",
            None,
            &[],
        ))
    }
}
