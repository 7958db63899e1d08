use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::Rule;
use crate::util::{icontains, ieq};

/// Fires on raw byte-buffer manipulation APIs (`Buffer.BlockCopy`,
/// `Array.Copy`, `BitConverter.GetBytes`). Deliberately Low severity: these
/// APIs are common in entirely benign serialization code, so the rule
/// exists purely as a noise-reducing signal that strengthens a companion
/// finding (e.g. `EncodedStringPipelineRule`) rather than to stand alone.
pub struct ByteArrayManipulationRule;

impl Rule for ByteArrayManipulationRule {
    fn id(&self) -> &'static str {
        "ByteArrayManipulationRule"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn description(&self) -> String {
        "Manipulates a raw byte buffer, often a step in decoding an obfuscated payload".into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "System.Buffer") && ieq(&callee.name, "BlockCopy"))
            || (icontains(&callee.declaring_type, "System.Array") && ieq(&callee.name, "Copy"))
            || (icontains(&callee.declaring_type, "BitConverter") && ieq(&callee.name, "GetBytes")))
    }
}
