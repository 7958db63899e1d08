use malscan_core::{MalscanError, ScanFinding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::LiteralContext;
use crate::rule::{finding, Rule};
use crate::util::icontains;

static BASE64_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$").unwrap());

static HEX_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[0-9A-Fa-f]{2})+$").unwrap());

// Both `-` and `,` are accepted segment separators: `"83-121-115-116"` and
// `"83, 121, 115, 116"` are both a byte array disguised as a string literal.
static NUMERIC_SEGMENTS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:\s*[-,]\s*\d{1,3}){3,}$").unwrap());

// Tokens checked for in a hex literal's decoded payload; a hash or GUID
// decodes to noise and never contains any of these.
const HEX_SUSPICIOUS_TOKENS: &[&str] = &[
    "http://", "https://", "cmd.exe", "powershell", "mshta", "regsvr32", "rundll32", "wscript",
    "cscript", ".exe", "iex ", "-enc",
];

/// Fires on a string literal that decodes as well-formed base64 and is at
/// least `minimum_encoded_string_length` characters long.
pub struct Base64Rule;

impl Rule for Base64Rule {
    fn id(&self) -> &'static str {
        "Base64Rule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Contains a long base64-encoded string literal, often used to embed an obfuscated \
         payload or command"
            .into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn analyze_string_literal(&self, ctx: &LiteralContext) -> Result<Vec<ScanFinding>, MalscanError> {
        if ctx.literal.len() < ctx.minimum_encoded_string_length.max(16) {
            return Ok(Vec::new());
        }
        if !BASE64_PATTERN.is_match(ctx.literal) {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            format!("{}:{}", ctx.method_key, ctx.offset),
            self.description(),
            None,
        )])
    }
}

/// Fires on a string literal that is an even-length run of hex digits at
/// least 16 characters long.
pub struct HexStringRule;

impl Rule for HexStringRule {
    fn id(&self) -> &'static str {
        "HexStringRule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Contains a long hex-encoded string literal, often used to embed an obfuscated \
         payload or key material"
            .into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn analyze_string_literal(&self, ctx: &LiteralContext) -> Result<Vec<ScanFinding>, MalscanError> {
        if ctx.literal.len() < 16 || ctx.literal.len() % 2 != 0 {
            return Ok(Vec::new());
        }
        if !HEX_PATTERN.is_match(ctx.literal) {
            return Ok(Vec::new());
        }
        let Some(decoded) = decode_hex(ctx.literal) else {
            return Ok(Vec::new());
        };
        let payload = String::from_utf8_lossy(&decoded);
        if !HEX_SUSPICIOUS_TOKENS.iter().any(|token| icontains(&payload, token)) {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            format!("{}:{}", ctx.method_key, ctx.offset),
            self.description(),
            None,
        )])
    }
}

/// Decodes an even-length hex-digit string into raw bytes, one pair at a
/// time. Returns `None` on a malformed pair (unreachable once the caller has
/// already checked `HEX_PATTERN`, kept as a guard rather than an `unwrap`).
fn decode_hex(literal: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = literal.chars().collect();
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).ok()
        })
        .collect()
}

/// Fires on a string literal shaped like a dash- or comma-separated run of
/// small decimal numbers — a byte array disguised as a string literal to
/// dodge a naive `newarr uint8` scan.
pub struct EncodedStringLiteralRule;

impl Rule for EncodedStringLiteralRule {
    fn id(&self) -> &'static str {
        "EncodedStringLiteralRule"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> String {
        "Contains a string literal shaped like a comma-separated byte sequence, a common way \
         to smuggle a byte array disguised as text"
            .into()
    }

    fn requires_companion(&self) -> bool {
        true
    }

    fn analyze_string_literal(&self, ctx: &LiteralContext) -> Result<Vec<ScanFinding>, MalscanError> {
        if !NUMERIC_SEGMENTS_PATTERN.is_match(ctx.literal) {
            return Ok(Vec::new());
        }
        let segment_count = ctx.literal.split(['-', ',']).count();
        if segment_count < ctx.minimum_encoded_string_length {
            return Ok(Vec::new());
        }
        Ok(vec![finding(
            self,
            format!("{}:{}", ctx.method_key, ctx.offset),
            self.description(),
            None,
        )])
    }
}
