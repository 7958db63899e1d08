use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::{guidance, Rule};
use crate::util::{icontains, ieq};

/// Fires on `Assembly.Load(byte[])`, `Assembly.LoadFile`, or
/// `Assembly.LoadFrom` — loading a managed assembly from memory or an
/// arbitrary path rather than through the normal plugin-loader mechanism.
pub struct AssemblyDynamicLoadRule;

impl Rule for AssemblyDynamicLoadRule {
    fn id(&self) -> &'static str {
        "AssemblyDynamicLoadRule"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> String {
        "Dynamically loads a managed assembly at runtime, bypassing the normal mod/plugin \
         loading path"
            .into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "Ship additional managed code as a declared mod dependency instead of loading it \
             dynamically at runtime.",
            None,
            &[],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "System.Reflection.Assembly")
            && (ieq(&callee.name, "Load")
                || ieq(&callee.name, "LoadFile")
                || ieq(&callee.name, "LoadFrom")
                || ieq(&callee.name, "LoadModule")))
    }
}
