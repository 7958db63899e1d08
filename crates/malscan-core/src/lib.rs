pub mod config;
pub mod error;
pub mod finding;
pub mod signals;
pub mod types;

pub use config::{DeepAnalysisConfig, ScanConfig};
pub use error::{MalscanError, Result};
pub use finding::{
    AssemblyDependencyGraph, AssemblyRole, CallChain, CallChainNode, DataFlowChain,
    DataFlowEvent, DataFlowNode, DataFlowNodeKind, DataFlowPattern, DepEdge, DepEdgeType,
    DepNode, DeveloperGuidance, ScanFinding,
};
pub use signals::{MethodSignals, TypeSignals};
pub use types::{
    Assembly, CilType, EmbeddedResource, ExceptionHandler, HandlerKind, Instruction,
    LocalVariable, Method, MethodKey, MethodRef, MethodSignature, Module, Operand, PInvokeInfo,
    Severity,
};
