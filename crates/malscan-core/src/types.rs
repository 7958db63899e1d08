use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finding severity. Declaration order doubles as comparison order: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Stable key identifying a method across the engine: `Namespace.Type.Method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey(pub String);

impl MethodKey {
    pub fn new(declaring_type: &str, method_name: &str) -> Self {
        MethodKey(format!("{declaring_type}.{method_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved reference to a callee, as seen from a `call`/`callvirt` site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    pub param_count: usize,
}

impl MethodRef {
    pub fn key(&self) -> MethodKey {
        MethodKey::new(&self.declaring_type, &self.name)
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

/// Instruction operand kinds the engine reasons about. Narrower than the full
/// CIL operand space `dotscope` exposes; `malscan-il` projects down to this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    MethodRef(MethodRef),
    String(String),
    Int(i64),
    SByte(i8),
    InstructionOffset(u32),
    BranchTargets(Vec<u32>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: String,
    pub operand: Operand,
}

impl Instruction {
    pub fn is_call(&self) -> bool {
        matches!(self.opcode.as_str(), "call" | "callvirt")
    }

    pub fn method_ref(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::MethodRef(m) => Some(m),
            _ => None,
        }
    }

    pub fn string_literal(&self) -> Option<&str> {
        match &self.operand {
            Operand::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerKind {
    Catch,
    Filter,
    Finally,
    Fault,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub kind: HandlerKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
}

impl ExceptionHandler {
    /// `[handler_start, handler_end)`, per the exception-handler offset invariant.
    pub fn handler_range(&self) -> std::ops::Range<u32> {
        self.handler_start..self.handler_end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PInvokeInfo {
    pub dll_name: String,
    pub entry_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariable {
    pub index: u32,
    pub type_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodSignature {
    pub param_types: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub key: MethodKey,
    pub name: String,
    pub declaring_type: String,
    pub signature: MethodSignature,
    pub instructions: Vec<Instruction>,
    pub exception_handlers: Vec<ExceptionHandler>,
    pub locals: Vec<LocalVariable>,
    pub pinvoke: Option<PInvokeInfo>,
}

impl Method {
    pub fn has_body(&self) -> bool {
        !self.instructions.is_empty()
    }

    /// Offsets covered by any exception handler's handler block (not the try block).
    pub fn handler_offsets(&self) -> std::collections::HashSet<u32> {
        let mut offsets = std::collections::HashSet::new();
        for handler in &self.exception_handlers {
            for instr in &self.instructions {
                if handler.handler_range().contains(&instr.offset) {
                    offsets.insert(instr.offset);
                }
            }
        }
        offsets
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CilType {
    pub full_name: String,
    pub methods: Vec<Method>,
    pub custom_attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedResource {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub types: Vec<CilType>,
    pub resources: Vec<EmbeddedResource>,
    pub assembly_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub virtual_path: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub modules: Vec<Module>,
}

impl Assembly {
    pub fn methods(&self) -> impl Iterator<Item = (&CilType, &Method)> {
        self.modules
            .iter()
            .flat_map(|m| m.types.iter())
            .flat_map(|t| t.methods.iter().map(move |method| (t, method)))
    }
}
