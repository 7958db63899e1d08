use malscan_core::{MalscanError, MethodRef, Severity};

use crate::context::ContextualContext;
use crate::rule::{finding, Rule};
use crate::util::{icontains, ieq, preceding_string_literal};

/// Fires specifically on `Environment.SetEnvironmentVariable("PATH", ...)` —
/// tampering with the user's PATH is a common persistence/hijack primitive,
/// distinct from setting an arbitrary environment variable (which is too
/// common in legitimate mods to flag on its own).
pub struct EnvironmentPathRule;

impl Rule for EnvironmentPathRule {
    fn id(&self) -> &'static str {
        "EnvironmentPathRule"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> String {
        "Modifies the PATH environment variable, a common technique for hijacking subsequent \
         process launches"
            .into()
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "System.Environment") && ieq(&callee.name, "SetEnvironmentVariable"))
    }

    fn analyze_contextual_pattern(&self, ctx: &ContextualContext) -> Result<Vec<malscan_core::ScanFinding>, MalscanError> {
        const LOOKBACK: usize = 4;
        let Some(literal) = preceding_string_literal(ctx.instructions, ctx.index, LOOKBACK) else {
            return Ok(Vec::new());
        };
        if !ieq(literal, "PATH") {
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
