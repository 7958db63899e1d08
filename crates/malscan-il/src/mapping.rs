use dotscope::assembly::{Immediate, Operand as CilOperand};
use dotscope::metadata::method::Method as CilMethod;
use dotscope::metadata::typesystem::CilType as CilTypeDef;
use dotscope::CilObject;

use malscan_core::{
    CilType, EmbeddedResource, ExceptionHandler, HandlerKind, Instruction, LocalVariable, Method,
    MethodKey, MethodRef, MethodSignature, Module, Operand, PInvokeInfo,
};

/// Resolves a CIL method-ref/string token against the assembly's metadata
/// tables and heaps. This is the one place in the engine that reasons about
/// raw metadata tokens; everything downstream sees `malscan_core::Operand`.
pub(crate) fn resolve_operand(cil: &CilObject, operand: Option<&CilOperand>) -> Operand {
    let Some(operand) = operand else {
        return Operand::None;
    };

    match operand {
        CilOperand::Token(token) => {
            if let Some(target) = cil.method_by_token(*token) {
                Operand::MethodRef(MethodRef {
                    declaring_type: declaring_type_name(cil, target),
                    name: target.name.clone(),
                    param_count: target.params.len(),
                })
            } else if let Some(text) = cil
                .user_strings()
                .and_then(|heap| heap.get(token.index()).ok())
            {
                Operand::String(text.to_string())
            } else {
                Operand::None
            }
        }
        CilOperand::Immediate(Immediate::Int8(v)) => Operand::SByte(*v),
        CilOperand::Immediate(Immediate::Int16(v)) => Operand::Int(*v as i64),
        CilOperand::Immediate(Immediate::Int32(v)) => Operand::Int(*v as i64),
        CilOperand::Immediate(Immediate::Int64(v)) => Operand::Int(*v),
        CilOperand::Immediate(Immediate::UInt8(v)) => Operand::Int(*v as i64),
        CilOperand::Immediate(Immediate::Float32(v)) => Operand::Int(*v as i64),
        CilOperand::Immediate(Immediate::Float64(v)) => Operand::Int(*v as i64),
        CilOperand::BranchTarget(target) => Operand::InstructionOffset(*target as u32),
        CilOperand::BranchTargets(targets) => {
            Operand::BranchTargets(targets.iter().map(|t| *t as u32).collect())
        }
        CilOperand::String(s) => Operand::String(s.clone()),
        _ => Operand::None,
    }
}

fn declaring_type_name(cil: &CilObject, method: &CilMethod) -> String {
    cil.declaring_type_of(method)
        .map(|t| full_type_name(t))
        .unwrap_or_else(|| method.name.clone())
}

fn full_type_name(type_def: &CilTypeDef) -> String {
    if type_def.namespace.is_empty() {
        type_def.name.clone()
    } else {
        format!("{}.{}", type_def.namespace, type_def.name)
    }
}

pub(crate) fn convert_instruction(cil: &CilObject, raw: &dotscope::assembly::Instruction) -> Instruction {
    Instruction {
        offset: raw.offset,
        opcode: raw.mnemonic.to_lowercase(),
        operand: resolve_operand(cil, raw.operand.as_ref()),
    }
}

fn convert_handler_kind(kind: dotscope::metadata::method::ExceptionHandlerKind) -> HandlerKind {
    use dotscope::metadata::method::ExceptionHandlerKind as K;
    match kind {
        K::Catch(_) => HandlerKind::Catch,
        K::Filter(_) => HandlerKind::Filter,
        K::Finally => HandlerKind::Finally,
        K::Fault => HandlerKind::Fault,
    }
}

pub(crate) fn convert_method(cil: &CilObject, declaring_type: &str, raw: &CilMethod) -> Method {
    let instructions: Vec<Instruction> = raw
        .instructions()
        .iter()
        .map(|i| convert_instruction(cil, i))
        .collect();

    let exception_handlers = raw
        .exception_handlers()
        .iter()
        .map(|h| ExceptionHandler {
            kind: convert_handler_kind(h.kind.clone()),
            try_start: h.try_offset,
            try_end: h.try_offset + h.try_length,
            handler_start: h.handler_offset,
            handler_end: h.handler_offset + h.handler_length,
        })
        .collect();

    let locals = raw
        .locals()
        .iter()
        .enumerate()
        .map(|(index, local)| LocalVariable {
            index: index as u32,
            type_name: local.type_name(),
        })
        .collect();

    let pinvoke = raw.pinvoke_info().map(|p| PInvokeInfo {
        dll_name: p.module_name.clone(),
        entry_point: p.entry_point.clone(),
    });

    Method {
        key: MethodKey::new(declaring_type, &raw.name),
        name: raw.name.clone(),
        declaring_type: declaring_type.to_string(),
        signature: MethodSignature {
            param_types: raw.params.iter().map(|p| p.type_name()).collect(),
            return_type: raw.return_type_name(),
        },
        instructions,
        exception_handlers,
        locals,
        pinvoke,
    }
}

pub(crate) fn convert_type(cil: &CilObject, raw: &CilTypeDef) -> CilType {
    let full_name = full_type_name(raw);
    CilType {
        methods: raw
            .methods
            .iter()
            .map(|m| convert_method(cil, &full_name, m))
            .collect(),
        custom_attributes: raw
            .custom_attributes()
            .iter()
            .map(|a| a.type_name())
            .collect(),
        full_name,
    }
}

pub(crate) fn convert_module(cil: &CilObject) -> Module {
    let name = cil
        .module()
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "<module>".to_string());

    let types = cil
        .types()
        .iter()
        .map(|entry| convert_type(cil, entry.value()))
        .collect();

    let resources = cil
        .resources()
        .iter()
        .map(|r| EmbeddedResource {
            name: r.name.clone(),
            size_bytes: r.size as u64,
        })
        .collect();

    let assembly_refs = cil
        .assembly_refs()
        .iter()
        .map(|r| r.name.clone())
        .collect();

    Module {
        name,
        types,
        resources,
        assembly_refs,
    }
}
