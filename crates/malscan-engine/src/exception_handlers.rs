use malscan_core::{HandlerKind, Method, ScanFinding, Severity};
use malscan_rules::icontains;

const RULE_ID: &str = "SwallowedFailureRule";

/// Re-analyzes `catch`/`fault`/`finally` blocks with the context the main
/// instruction analyzer deliberately skips (§4.3 invariant: it must not
/// emit findings for offsets inside a handler). `fault` handlers are
/// treated identically to `finally` (open question resolved in DESIGN.md).
pub fn analyze_exception_handlers(method: &Method) -> Vec<ScanFinding> {
    let mut findings = Vec::new();

    for handler in &method.exception_handlers {
        let try_range = handler.try_start..handler.try_end;
        let handler_range = handler.handler_range();

        let risky_try = method
            .instructions
            .iter()
            .any(|instr| try_range.contains(&instr.offset) && is_risky_call(&instr.method_ref().map(|m| m.full_name())));

        if !risky_try {
            continue;
        }

        let handler_calls: Vec<_> = method
            .instructions
            .iter()
            .filter(|instr| handler_range.contains(&instr.offset) && instr.is_call())
            .collect();

        let swallows = handler_calls.is_empty()
            || !handler_calls.iter().any(|instr| {
                instr
                    .method_ref()
                    .is_some_and(|m| icontains(&m.declaring_type, "Exception") || logs_the_failure(m))
            });

        if !swallows {
            continue;
        }

        let kind_name = match handler.kind {
            HandlerKind::Catch => "catch",
            HandlerKind::Filter => "filter",
            HandlerKind::Finally => "finally",
            HandlerKind::Fault => "fault",
        };

        findings.push(ScanFinding {
            rule_id: RULE_ID.to_string(),
            location: format!("{}:{}", method.key, handler.handler_start),
            description: format!(
                "A risky operation in the try block is silently swallowed by an empty {kind_name} handler"
            ),
            severity: Severity::Medium,
            snippet: None,
            call_chain: None,
            data_flow_chain: None,
            bypass_companion: true,
            risk_score: None,
            developer_guidance: None,
        });
    }

    findings
}

fn is_risky_call(full_name: &Option<String>) -> bool {
    let Some(full_name) = full_name else { return false };
    const RISKY_SUBSTRINGS: &[&str] = &[
        "Process.Start",
        "File.WriteAllBytes",
        "File.Delete",
        "WebClient",
        "HttpClient",
        "RegistryKey",
        "Assembly.Load",
    ];
    RISKY_SUBSTRINGS.iter().any(|needle| full_name.contains(needle))
}

fn logs_the_failure(method_ref: &malscan_core::MethodRef) -> bool {
    icontains(&method_ref.declaring_type, "Log")
        || icontains(&method_ref.declaring_type, "Trace")
        || icontains(&method_ref.declaring_type, "Console")
}
