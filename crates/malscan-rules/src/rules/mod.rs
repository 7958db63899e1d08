mod assembly_dynamic_load;
mod byte_array;
mod com_reflection;
mod data_flow_calls;
mod encoded_literals;
mod encoded_pipeline;
mod environment_path;
mod native_imports;
mod persistence;
mod process_start;
mod reflection;
mod registry;
mod suspicious_local_variable;

pub use assembly_dynamic_load::AssemblyDynamicLoadRule;
pub use byte_array::ByteArrayManipulationRule;
pub use com_reflection::ComReflectionAttackRule;
pub use data_flow_calls::{DataExfiltrationRule, DataInfiltrationRule};
pub use encoded_literals::{Base64Rule, EncodedStringLiteralRule, HexStringRule};
pub use encoded_pipeline::{EncodedBlobSplittingRule, EncodedStringPipelineRule};
pub use environment_path::EnvironmentPathRule;
pub use native_imports::{DllImportRule, Shell32Rule};
pub use persistence::PersistenceRule;
pub use process_start::ProcessStartRule;
pub use reflection::{ReflectionRule, STRONG_COMPANION_RULE_IDS};
pub use registry::RegistryRule;
pub use suspicious_local_variable::SuspiciousLocalVariableRule;
