use malscan_core::{
    Assembly, CilType, Instruction, LocalVariable, Method, MethodKey, MethodRef, MethodSignature, Module,
    Operand, PInvokeInfo,
};

pub fn call(offset: u32, declaring_type: &str, name: &str, param_count: usize) -> Instruction {
    Instruction {
        offset,
        opcode: "call".into(),
        operand: Operand::MethodRef(MethodRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            param_count,
        }),
    }
}

pub fn ldstr(offset: u32, literal: &str) -> Instruction {
    Instruction { offset, opcode: "ldstr".into(), operand: Operand::String(literal.into()) }
}

pub fn ldc_i4(offset: u32, value: i64) -> Instruction {
    Instruction { offset, opcode: "ldc.i4".into(), operand: Operand::Int(value) }
}

pub fn nop(offset: u32) -> Instruction {
    Instruction { offset, opcode: "nop".into(), operand: Operand::None }
}

pub fn method(declaring_type: &str, name: &str, instructions: Vec<Instruction>) -> Method {
    Method {
        key: MethodKey::new(declaring_type, name),
        name: name.into(),
        declaring_type: declaring_type.into(),
        signature: MethodSignature::default(),
        instructions,
        exception_handlers: Vec::new(),
        locals: Vec::new(),
        pinvoke: None,
    }
}

pub fn with_locals(mut m: Method, types: &[&str]) -> Method {
    m.locals = types
        .iter()
        .enumerate()
        .map(|(i, t)| LocalVariable { index: i as u32, type_name: t.to_string() })
        .collect();
    m
}

pub fn pinvoke_method(declaring_type: &str, name: &str, dll_name: &str, entry_point: &str) -> Method {
    let mut m = method(declaring_type, name, Vec::new());
    m.pinvoke = Some(PInvokeInfo { dll_name: dll_name.into(), entry_point: entry_point.into() });
    m
}

/// Wraps every method under one type, in one module, in one assembly.
pub fn single_type_assembly(type_name: &str, methods: Vec<Method>) -> Assembly {
    Assembly {
        virtual_path: "Test.dll".into(),
        size_bytes: 0,
        sha256: "0".repeat(64),
        modules: vec![Module {
            name: "Test.dll".into(),
            types: vec![CilType { full_name: type_name.into(), methods, custom_attributes: Vec::new() }],
            resources: Vec::new(),
            assembly_refs: Vec::new(),
        }],
    }
}
