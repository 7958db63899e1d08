pub mod context;
pub mod rule;
mod registry;
mod rules;
mod util;

pub use context::{ContextualContext, LiteralContext, SuppressionContext};
pub use registry::RuleRegistry;
pub use rule::Rule;
pub use rules::{
    AssemblyDynamicLoadRule, Base64Rule, ByteArrayManipulationRule, ComReflectionAttackRule,
    DataExfiltrationRule, DataInfiltrationRule, DllImportRule, EncodedBlobSplittingRule,
    EncodedStringLiteralRule, EncodedStringPipelineRule, EnvironmentPathRule, HexStringRule,
    PersistenceRule, ProcessStartRule, ReflectionRule, RegistryRule, Shell32Rule,
    SuspiciousLocalVariableRule, STRONG_COMPANION_RULE_IDS,
};
pub use util::{icontains, ieq, preceding_string_literal, preceding_string_literals, snippet};
