use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::{guidance, Rule};
use crate::util::icontains;

/// Fires on any P/Invoke declaration bound to `shell32.dll` (the P/Invoke
/// scanner, §4.4, is the sole caller of `is_suspicious` for this rule —
/// there is no call-site to inspect, since a P/Invoke declaration has no
/// body).
pub struct Shell32Rule;

impl Rule for Shell32Rule {
    fn id(&self) -> &'static str {
        "Shell32Rule"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> String {
        "Declares a P/Invoke entry point into shell32.dll, commonly used for shell execution \
         and UAC-elevation bypass tricks"
            .into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "shell32.dll interop is almost never required by a Unity mod. Remove the P/Invoke \
             declaration or replace it with a managed equivalent.",
            None,
            &[],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(is_dll_declaring_type(&callee.declaring_type) && icontains(&callee.declaring_type, "shell32"))
    }
}

/// Broader native-import rule: any P/Invoke declaration at all. Requires a
/// companion signal since plenty of legitimate mods P/Invoke into benign
/// system DLLs (user32, kernel32) for window handling.
///
/// `is_suspicious` is only ever evaluated by the P/Invoke scanner against a
/// synthetic `MethodRef` built from `(dll_name, entry_point)` (§4.4) — real
/// call-site `MethodRef`s never carry a `.dll`-suffixed declaring type, so
/// this rule never fires against ordinary managed call sites in the
/// instruction analyzer's step-5 dispatch.
pub struct DllImportRule;

impl Rule for DllImportRule {
    fn id(&self) -> &'static str {
        "DllImportRule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Declares a native P/Invoke entry point".into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(is_dll_declaring_type(&callee.declaring_type))
    }
}

fn is_dll_declaring_type(declaring_type: &str) -> bool {
    declaring_type.to_lowercase().ends_with(".dll")
}
