use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Deep-behavior orchestrator configuration (§6, `deep-analysis` nested object).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeepAnalysisConfig {
    pub enable_deep_analysis: bool,
    pub enable_native_interop_correlation: bool,
    pub enable_execution_chain: bool,
    pub enable_string_decode_flow: bool,
    pub enable_resource_payload: bool,
    pub enable_dynamic_load_correlation: bool,
    pub enable_script_host_launch: bool,
    pub enable_environment_pivot: bool,
    pub deep_scan_only_flagged_methods: bool,
    pub max_instructions_per_method: usize,
    pub max_analysis_time_ms_per_method: u64,
    pub max_deep_methods_per_assembly: usize,
    pub emit_diagnostic_findings: bool,
    pub require_correlated_base_finding: bool,
}

impl Default for DeepAnalysisConfig {
    fn default() -> Self {
        Self {
            enable_deep_analysis: false,
            enable_native_interop_correlation: true,
            enable_execution_chain: true,
            enable_string_decode_flow: true,
            enable_resource_payload: true,
            enable_dynamic_load_correlation: true,
            enable_script_host_launch: true,
            enable_environment_pivot: true,
            deep_scan_only_flagged_methods: true,
            max_instructions_per_method: 20_000,
            max_analysis_time_ms_per_method: 120,
            max_deep_methods_per_assembly: 300,
            emit_diagnostic_findings: false,
            require_correlated_base_finding: true,
        }
    }
}

/// Top-level scan configuration. Every field has a documented default (§6);
/// loaded in layers the way the teacher's `ServerConfig`/`Settings` are:
/// compiled-in defaults, overridden by an optional TOML file, overridden by
/// `MALSCAN_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    pub enable_multi_signal_detection: bool,
    pub analyze_exception_handlers: bool,
    pub analyze_local_variables: bool,
    pub analyze_property_accessors: bool,
    pub detect_assembly_metadata: bool,
    pub enable_cross_method_analysis: bool,
    pub max_call_chain_depth: usize,
    pub enable_return_value_tracking: bool,
    pub enable_recursive_resource_scanning: bool,
    pub max_recursive_resource_size_mb: u64,
    pub minimum_encoded_string_length: usize,
    pub developer_mode: bool,
    pub deep_analysis: DeepAnalysisConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enable_multi_signal_detection: true,
            analyze_exception_handlers: true,
            analyze_local_variables: true,
            analyze_property_accessors: true,
            detect_assembly_metadata: true,
            enable_cross_method_analysis: true,
            max_call_chain_depth: 5,
            enable_return_value_tracking: true,
            enable_recursive_resource_scanning: true,
            max_recursive_resource_size_mb: 10,
            minimum_encoded_string_length: 10,
            developer_mode: false,
            deep_analysis: DeepAnalysisConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load defaults, then an optional TOML file, then `MALSCAN_*` env overrides
    /// (e.g. `MALSCAN_DEVELOPER_MODE=true`, `MALSCAN_DEEP_ANALYSIS__ENABLE_DEEP_ANALYSIS=true`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ScanConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("MALSCAN")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ScanConfig::default();
        assert!(cfg.enable_multi_signal_detection);
        assert_eq!(cfg.max_call_chain_depth, 5);
        assert_eq!(cfg.minimum_encoded_string_length, 10);
        assert!(!cfg.deep_analysis.enable_deep_analysis);
        assert_eq!(cfg.deep_analysis.max_analysis_time_ms_per_method, 120);
        assert_eq!(cfg.deep_analysis.max_deep_methods_per_assembly, 300);
    }

    #[test]
    fn load_without_file_returns_defaults() {
        let cfg = ScanConfig::load(None).expect("defaults should always load");
        assert_eq!(cfg, ScanConfig::default());
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("malscan.toml");
        std::fs::write(&path, "developer_mode = true\nmax_call_chain_depth = 3\n").unwrap();

        let cfg = ScanConfig::load(Some(&path)).unwrap();
        assert!(cfg.developer_mode);
        assert_eq!(cfg.max_call_chain_depth, 3);
    }
}
