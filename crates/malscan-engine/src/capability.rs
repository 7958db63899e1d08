use malscan_core::{Instruction, MethodRef, MethodSignals, Operand};
use malscan_rules::icontains;

const SENSITIVE_FOLDER_IDS: &[i64] = &[7, 26, 28, 35];

/// Deduces capability bits from a callee signature (§4.2). This is the
/// `update-from-call` helper the signal tracker calls for every `call`/
/// `callvirt` site before any rule dispatch happens.
pub fn update_from_call(signals: &mut MethodSignals, callee: &MethodRef) {
    if is_file_write(callee) {
        signals.file_write = true;
    }
    if is_env_modify(callee) {
        signals.env_modified = true;
    }
}

fn is_file_write(callee: &MethodRef) -> bool {
    icontains(&callee.declaring_type, "System.IO.File")
        && matches!(
            callee.name.as_str(),
            "WriteAllBytes" | "WriteAllText" | "WriteAllLines" | "Copy" | "AppendAllText" | "AppendAllBytes"
        )
        || icontains(&callee.declaring_type, "FileStream")
        || icontains(&callee.declaring_type, "BinaryWriter")
        || icontains(&callee.declaring_type, "StreamWriter")
}

fn is_env_modify(callee: &MethodRef) -> bool {
    icontains(&callee.declaring_type, "System.Environment") && callee.name == "SetEnvironmentVariable"
}

/// Checks whether the call at `index` is `Environment.GetFolderPath` with a
/// constant argument naming one of the sensitive, well-known folders, and
/// if so marks the signal. The constant is expected as an `Int` operand on
/// the instruction immediately preceding the call (the `ldc.i4` that pushes
/// the `Environment.SpecialFolder` enum value).
pub fn mark_sensitive_folder(signals: &mut MethodSignals, instructions: &[Instruction], index: usize, callee: &MethodRef) {
    if !(icontains(&callee.declaring_type, "System.Environment") && callee.name == "GetFolderPath") {
        return;
    }
    let Some(prev) = index.checked_sub(1).and_then(|i| instructions.get(i)) else {
        return;
    };
    if let Operand::Int(value) = prev.operand {
        if SENSITIVE_FOLDER_IDS.contains(&value) {
            signals.sensitive_folder = true;
        }
    }
}
