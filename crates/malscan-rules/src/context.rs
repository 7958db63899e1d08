use malscan_core::{Instruction, MethodRef, MethodSignals};

/// Context handed to `Rule::analyze_contextual_pattern`: the call site plus a
/// small window of surrounding instructions and the method's signals so far.
pub struct ContextualContext<'a> {
    pub callee: &'a MethodRef,
    pub instructions: &'a [Instruction],
    pub index: usize,
    pub method_signals: &'a MethodSignals,
    pub method_key: &'a str,
    pub declaring_type: &'a str,
}

impl<'a> ContextualContext<'a> {
    pub fn location(&self) -> String {
        format!(
            "{}:{}",
            self.method_key, self.instructions[self.index].offset
        )
    }
}

/// Context handed to `Rule::should_suppress_finding`: adds the enclosing
/// type's aggregated signals to what `ContextualContext` already carries.
pub struct SuppressionContext<'a> {
    pub callee: &'a MethodRef,
    pub instructions: &'a [Instruction],
    pub index: usize,
    pub method_signals: &'a MethodSignals,
    pub type_signals: &'a MethodSignals,
}

/// Context handed to `Rule::analyze_string_literal` for each `ldstr` operand.
pub struct LiteralContext<'a> {
    pub literal: &'a str,
    pub method_key: &'a str,
    pub offset: u32,
    pub minimum_encoded_string_length: usize,
}
