use thiserror::Error;

/// The error taxonomy from the error-handling design: input errors abort a
/// scan before it starts, rule errors never escape the instruction analyzer,
/// resolver errors degrade to a warning, and invariant breaches are fail-fast.
#[derive(Error, Debug)]
pub enum MalscanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InputError(String),

    #[error("malformed assembly: {0}")]
    Malformed(String),

    #[error("rule '{rule_id}' failed: {message}")]
    RuleError { rule_id: String, message: String },

    #[error("assembly resolver failed: {0}")]
    ResolverError(String),

    #[error("internal invariant breach: {0}")]
    Invariant(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, MalscanError>;
