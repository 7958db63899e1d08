use malscan_core::{MalscanError, MethodRef, Severity};

use crate::context::SuppressionContext;
use crate::rule::{guidance, Rule};
use crate::util::{icontains, ieq, path_manipulation_between, preceding_call_matches};

/// Fires on `System.Diagnostics.Process.Start`. Heavily suppressed by
/// contextual whitelisting (§4.7) rather than companion-gated — most Unity
/// mods never legitimately spawn a process, so the rule fires standalone,
/// but a handful of benign shapes (restarting Explorer, relaunching the
/// current process) are carved out explicitly.
pub struct ProcessStartRule;

impl Rule for ProcessStartRule {
    fn id(&self) -> &'static str {
        "ProcessStartRule"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> String {
        "Launches an external process, a primary vector for droppers and command execution".into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "Avoid shelling out to external processes from mod code. If interop with a native \
             tool is required, invoke it through a documented, narrowly-scoped API instead of \
             Process.Start with a dynamically constructed command line.",
            None,
            &["Process.Start with a fixed, non-concatenated executable path"],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "System.Diagnostics.Process") && ieq(&callee.name, "Start"))
    }

    fn should_suppress_finding(&self, ctx: &SuppressionContext) -> Result<bool, MalscanError> {
        if ctx.method_signals.file_write
            || ctx.method_signals.env_modified
            || ctx.type_signals.file_write
            || ctx.type_signals.env_modified
        {
            return Ok(false);
        }

        if suppresses_bare_explorer(ctx) {
            return Ok(true);
        }

        Ok(suppresses_current_process_restart(ctx))
    }
}

fn suppresses_bare_explorer(ctx: &SuppressionContext) -> bool {
    const LOOKBACK: usize = 10;
    let Some(literal) = crate::util::preceding_string_literal(ctx.instructions, ctx.index, LOOKBACK)
    else {
        return false;
    };
    if !ieq(literal, "explorer.exe") {
        return false;
    }
    if literal.contains('/') || literal.contains('\\') || literal.contains(':') {
        return false;
    }
    let literal_index = ctx.instructions[..ctx.index]
        .iter()
        .rposition(|i| i.string_literal() == Some(literal));
    match literal_index {
        Some(lit_idx) => !path_manipulation_between(ctx.instructions, lit_idx, ctx.index),
        None => true,
    }
}

fn suppresses_current_process_restart(ctx: &SuppressionContext) -> bool {
    const LOOKBACK: usize = 40;
    const SEQUENCE: &[(&str, &str)] = &[
        ("Process", "GetCurrentProcess"),
        ("Process", "get_MainModule"),
        ("ProcessModule", "get_FileName"),
    ];

    if !preceding_call_matches(ctx.instructions, ctx.index, LOOKBACK, SEQUENCE) {
        return false;
    }

    let get_file_name_index = ctx.instructions[..ctx.index].iter().rposition(|i| {
        i.method_ref()
            .is_some_and(|m| icontains(&m.declaring_type, "ProcessModule") && ieq(&m.name, "get_FileName"))
    });

    match get_file_name_index {
        Some(idx) => !path_manipulation_between(ctx.instructions, idx, ctx.index),
        None => false,
    }
}
