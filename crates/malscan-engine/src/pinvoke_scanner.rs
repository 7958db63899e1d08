use malscan_core::{Method, MethodRef};
use malscan_rules::RuleRegistry;
use tracing::warn;

use crate::call_graph::{CallGraphBuilder, SuspiciousDeclInfo};

/// Walks every method with a P/Invoke declaration (§4.4). The synthetic
/// `MethodRef` handed to `Rule::is_suspicious` carries the DLL name as its
/// declaring type and the entry point as its name, so rules written against
/// ordinary call-site `MethodRef`s (e.g. `DllImportRule`) evaluate the
/// declaration exactly as they would a call.
pub fn scan_pinvoke_declarations(
    methods: &[&Method],
    registry: &RuleRegistry,
    call_graph: &mut CallGraphBuilder,
) {
    for method in methods {
        let Some(pinvoke) = &method.pinvoke else { continue };
        let synthetic = MethodRef {
            declaring_type: pinvoke.dll_name.clone(),
            name: pinvoke.entry_point.clone(),
            param_count: method.signature.param_types.len(),
        };

        let rule = registry.rules().iter().find(|r| match r.is_suspicious(&synthetic) {
            Ok(suspicious) => suspicious,
            Err(err) => {
                warn!(rule_id = r.id(), method = %method.key, %err, "rule failed evaluating a P/Invoke declaration");
                false
            }
        });
        let Some(rule) = rule else { continue };

        call_graph.register_declaration(
            method.key.clone(),
            SuspiciousDeclInfo {
                rule_id: rule.id().to_string(),
                severity: rule.severity(),
                description: format!(
                    "{} (P/Invoke: {}!{})",
                    rule.description(),
                    pinvoke.dll_name,
                    pinvoke.entry_point
                ),
                developer_guidance: rule.developer_guidance(),
                snippet: Some(format!("[DllImport(\"{}\", EntryPoint = \"{}\")]", pinvoke.dll_name, pinvoke.entry_point)),
            },
        );
    }
}
