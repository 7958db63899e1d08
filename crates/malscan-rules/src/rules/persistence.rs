use malscan_core::{MalscanError, MethodRef, ScanFinding, Severity};

use crate::context::ContextualContext;
use crate::rule::{finding, guidance, Rule};
use crate::util::{icontains, ieq, preceding_string_literals};

/// Fires on a registry-key write whose preceding literal names a well-known
/// autorun location, or a file write into the Windows Startup folder —
/// the two dominant persistence primitives on this platform.
pub struct PersistenceRule;

const AUTORUN_MARKERS: &[&str] = &[
    "currentversion\\run",
    "currentversion\\runonce",
    "startup",
    "winlogon",
];

impl Rule for PersistenceRule {
    fn id(&self) -> &'static str {
        "PersistenceRule"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> String {
        "Writes to a well-known autorun location, establishing persistence across restarts".into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "A mod has no legitimate reason to register itself to run outside of the host \
             game process. Remove the autorun registration.",
            None,
            &[],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "RegistryKey") && ieq(&callee.name, "SetValue"))
            || (icontains(&callee.declaring_type, "System.IO.File")
                && (ieq(&callee.name, "Copy") || ieq(&callee.name, "WriteAllBytes"))))
    }

    fn analyze_contextual_pattern(&self, ctx: &ContextualContext) -> Result<Vec<ScanFinding>, MalscanError> {
        const LOOKBACK: usize = 8;
        let literals = preceding_string_literals(ctx.instructions, ctx.index, LOOKBACK);
        let hits_marker = literals
            .iter()
            .any(|lit| AUTORUN_MARKERS.iter().any(|marker| lit.to_lowercase().contains(marker)));
        if !hits_marker {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            ctx.location(),
            self.description(),
            Some(crate::util::snippet(ctx.instructions, ctx.index, 2)),
        )])
    }
}
