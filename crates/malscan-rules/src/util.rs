use malscan_core::{Instruction, Operand};

/// Case-insensitive substring test, used pervasively for matching declaring
/// types / dll names against a few dozen known-dangerous patterns.
pub fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn ieq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Nearest preceding string literal within `lookback` instructions of `index`.
pub fn preceding_string_literal<'a>(
    instructions: &'a [Instruction],
    index: usize,
    lookback: usize,
) -> Option<&'a str> {
    let start = index.saturating_sub(lookback);
    instructions[start..index]
        .iter()
        .rev()
        .find_map(|i| i.string_literal())
}

/// All string literals within `lookback` instructions of `index`, nearest first.
pub fn preceding_string_literals<'a>(
    instructions: &'a [Instruction],
    index: usize,
    lookback: usize,
) -> Vec<&'a str> {
    let start = index.saturating_sub(lookback);
    instructions[start..index]
        .iter()
        .rev()
        .filter_map(|i| i.string_literal())
        .collect()
}

/// True if any call in the window `[index - lookback, index)` invokes a
/// method whose declaring type or name matches one of `patterns`.
pub fn preceding_call_matches(
    instructions: &[Instruction],
    index: usize,
    lookback: usize,
    patterns: &[(&str, &str)],
) -> bool {
    let start = index.saturating_sub(lookback);
    instructions[start..index].iter().any(|instr| {
        instr.method_ref().is_some_and(|m| {
            patterns
                .iter()
                .any(|(ty, name)| icontains(&m.declaring_type, ty) && icontains(&m.name, name))
        })
    })
}

/// Builds a `±k`-instruction snippet around `index`, one instruction per line.
pub fn snippet(instructions: &[Instruction], index: usize, k: usize) -> String {
    let start = index.saturating_sub(k);
    let end = (index + k + 1).min(instructions.len());
    instructions[start..end]
        .iter()
        .map(|instr| format!("{:>6}: {} {}", instr.offset, instr.opcode, operand_text(&instr.operand)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn operand_text(operand: &Operand) -> String {
    match operand {
        Operand::None => String::new(),
        Operand::MethodRef(m) => m.full_name(),
        Operand::String(s) => format!("{:?}", s),
        Operand::Int(i) => i.to_string(),
        Operand::SByte(i) => i.to_string(),
        Operand::InstructionOffset(o) => format!("-> {o}"),
        Operand::BranchTargets(targets) => format!("{:?}", targets),
    }
}

/// Checks whether a path manipulation call occurs within the window
/// `(start, index)`, exclusive of both ends — used by the process-start
/// suppression rules (§4.7).
pub fn path_manipulation_between(instructions: &[Instruction], start: usize, index: usize) -> bool {
    const PATTERNS: &[(&str, &str)] = &[
        ("String", "Concat"),
        ("String", "Format"),
        ("String", "Replace"),
        ("Path", "Combine"),
        ("Path", "Join"),
        ("Path", "GetFullPath"),
    ];
    if start >= index {
        return false;
    }
    instructions[start + 1..index].iter().any(|instr| {
        instr.method_ref().is_some_and(|m| {
            PATTERNS
                .iter()
                .any(|(ty, name)| icontains(&m.declaring_type, ty) && icontains(&m.name, name))
        })
    })
}
