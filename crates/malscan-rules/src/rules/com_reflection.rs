use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::{guidance, Rule};
use crate::util::{icontains, ieq};

/// Fires on COM-interop primitives that let managed code reach an
/// arbitrary COM object by ProgID/CLSID at runtime — `Type.GetTypeFromProgID`,
/// `Type.GetTypeFromCLSID`, `Marshal.GetActiveObject` — a well-known
/// technique for driving WScript.Shell or similar automation objects from
/// .NET without a static reference to them.
pub struct ComReflectionAttackRule;

impl Rule for ComReflectionAttackRule {
    fn id(&self) -> &'static str {
        "ComReflectionAttackRule"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> String {
        "Resolves a COM object by ProgID/CLSID at runtime, a common way to drive shell \
         automation objects without a static reference"
            .into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "Remove the dynamic COM interop call. If COM interop is genuinely required, \
             reference the COM type statically so it is visible to static analysis.",
            None,
            &[],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "System.Type")
            && (ieq(&callee.name, "GetTypeFromProgID") || ieq(&callee.name, "GetTypeFromCLSID")))
            || (icontains(&callee.declaring_type, "Marshal") && ieq(&callee.name, "GetActiveObject")))
    }
}
