use malscan_core::{MalscanError, MethodRef, ScanFinding, Severity};

use crate::context::ContextualContext;
use crate::rule::{finding, Rule};
use crate::util::{icontains, ieq, preceding_call_matches};

/// Fires when a decode call (`Convert.FromBase64String`) is immediately
/// followed, within a short window, by a decrypt or decompress call —
/// the layered-obfuscation shape the data-flow analyzer's transform chain
/// also looks for, captured here as a cheap contextual rule.
pub struct EncodedStringPipelineRule;

const DECRYPT_OR_DECOMPRESS: &[(&str, &str)] = &[
    ("CryptoStream", "Read"),
    ("Aes", "CreateDecryptor"),
    ("DES", "CreateDecryptor"),
    ("GZipStream", "Read"),
    ("DeflateStream", "Read"),
    ("ICryptoTransform", "TransformFinalBlock"),
];

impl Rule for EncodedStringPipelineRule {
    fn id(&self) -> &'static str {
        "EncodedStringPipelineRule"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> String {
        "Decodes a string literal and immediately feeds it through a decrypt or decompress \
         step, a layered-obfuscation shape typical of staged payload delivery"
            .into()
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "Convert") && ieq(&callee.name, "FromBase64String"))
    }

    fn analyze_contextual_pattern(&self, ctx: &ContextualContext) -> Result<Vec<ScanFinding>, MalscanError> {
        const FORWARD_WINDOW: usize = 12;
        let end = (ctx.index + FORWARD_WINDOW).min(ctx.instructions.len());
        let hit = ctx.instructions[ctx.index..end].iter().any(|instr| {
            instr.method_ref().is_some_and(|m| {
                DECRYPT_OR_DECOMPRESS
                    .iter()
                    .any(|(ty, name)| icontains(&m.declaring_type, ty) && icontains(&m.name, name))
            })
        });
        if !hit {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            ctx.location(),
            self.description(),
            Some(crate::util::snippet(ctx.instructions, ctx.index, 4)),
        )])
    }
}

/// Fires when an encoded literal (base64/hex) is rejoined with other
/// literals via `String.Concat`/`String.Join`/`StringBuilder.Append` before
/// decoding — blob-splitting is used to keep any single literal short
/// enough to dodge a length-based encoded-string scan.
pub struct EncodedBlobSplittingRule;

const JOIN_CALLS: &[(&str, &str)] = &[
    ("System.String", "Concat"),
    ("System.String", "Join"),
    ("StringBuilder", "Append"),
];

impl Rule for EncodedBlobSplittingRule {
    fn id(&self) -> &'static str {
        "EncodedBlobSplittingRule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Rejoins several string literals immediately before decoding them, a pattern used to \
         split an encoded payload across literals too short to trip a length-based scan"
            .into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok(icontains(&callee.declaring_type, "Convert")
            && (ieq(&callee.name, "FromBase64String") || ieq(&callee.name, "FromHexString")))
    }

    fn analyze_contextual_pattern(&self, ctx: &ContextualContext) -> Result<Vec<ScanFinding>, MalscanError> {
        const LOOKBACK: usize = 15;
        if !preceding_call_matches(ctx.instructions, ctx.index, LOOKBACK, JOIN_CALLS) {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            ctx.location(),
            self.description(),
            Some(crate::util::snippet(ctx.instructions, ctx.index, 3)),
        )])
    }
}
