use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::Rule;
use crate::util::{icontains, ieq};

/// Strong-companion allow-list for `ReflectionRule` (§4.3 step 5 / §3): a
/// bare reflective invocation is ubiquitous in managed code and is only
/// meaningful alongside one of these higher-signal rules. Engine dispatch
/// consults this list directly rather than the generic `requires_companion`
/// veto, since a weak companion (e.g. `ByteArrayManipulationRule` alone)
/// must not be enough.
pub const STRONG_COMPANION_RULE_IDS: &[&str] = &[
    "ProcessStartRule",
    "Shell32Rule",
    "AssemblyDynamicLoadRule",
    "ComReflectionAttackRule",
    "PersistenceRule",
    "RegistryRule",
    "DataExfiltrationRule",
    "DataInfiltrationRule",
    "Base64Rule",
    "HexStringRule",
    "EncodedStringLiteralRule",
    "EncodedStringPipelineRule",
    "EncodedBlobSplittingRule",
];

/// Fires on reflective invocation (`MethodBase.Invoke`, `Type.InvokeMember`,
/// `Activator.CreateInstance`). Dispatch for this rule is deferred: the
/// instruction analyzer queues candidate call sites and only emits a finding
/// once the enclosing method or type has triggered one of
/// `STRONG_COMPANION_RULE_IDS`.
pub struct ReflectionRule;

impl Rule for ReflectionRule {
    fn id(&self) -> &'static str {
        "ReflectionRule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Invokes a member reflectively, often used to obscure a call to a sensitive API from \
         static disassembly"
            .into()
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "MethodBase") && ieq(&callee.name, "Invoke"))
            || (icontains(&callee.declaring_type, "System.Type") && ieq(&callee.name, "InvokeMember"))
            || (icontains(&callee.declaring_type, "Activator") && ieq(&callee.name, "CreateInstance")))
    }
}
