mod call_graph;
mod capability;
mod data_flow;
mod deep_behavior;
mod exception_handlers;
mod instruction_analyzer;
mod local_variables;
mod pinvoke_scanner;
mod scanner;
mod signal_tracker;

pub use call_graph::{CallGraphBuilder, CallSite, SuspiciousDeclInfo};
pub use deep_behavior::{DeepAnalysisContext, DeepAnalyzer, DeepBehaviorOrchestrator};
pub use instruction_analyzer::{InstructionAnalyzer, PendingReflection};
pub use scanner::AssemblyScanner;
pub use signal_tracker::SignalTracker;
