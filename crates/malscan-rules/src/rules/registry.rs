use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::{guidance, Rule};
use crate::util::icontains;

/// Fires on any call into `Microsoft.Win32.Registry`/`RegistryKey` —
/// reading is common enough to be weak signal on its own, but this rule
/// fires on both read and write since a Unity mod has essentially no
/// legitimate reason to touch the registry at all.
pub struct RegistryRule;

impl Rule for RegistryRule {
    fn id(&self) -> &'static str {
        "RegistryRule"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> String {
        "Reads or writes a Windows registry key".into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "Persist mod settings to a file under the mod's own data directory instead of the \
             registry.",
            None,
            &["PlayerPrefs", "a JSON/TOML settings file"],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "Microsoft.Win32.Registry")
            || icontains(&callee.declaring_type, "RegistryKey"))
    }
}
