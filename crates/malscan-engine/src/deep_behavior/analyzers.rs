use malscan_core::{DeepAnalysisConfig, ScanFinding, Severity};

use super::{escalate, DeepAnalysisContext, DeepAnalyzer};

fn deep_finding(rule_id: &str, ctx: &DeepAnalysisContext, offset: u32, severity: Severity, description: String) -> ScanFinding {
    ScanFinding {
        rule_id: rule_id.to_string(),
        location: format!("{}:{}", ctx.method.key, offset),
        description,
        severity,
        snippet: None,
        call_chain: None,
        data_flow_chain: None,
        bypass_companion: true,
        risk_score: None,
        developer_guidance: None,
    }
}

pub struct NativeInteropCorrelationAnalyzer;

impl DeepAnalyzer for NativeInteropCorrelationAnalyzer {
    fn id(&self) -> &'static str {
        "NativeInteropCorrelationAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_native_interop_correlation
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_any_finding(&["DllImportRule", "Shell32Rule"]) {
            return Vec::new();
        }
        let severity = if ctx.has_any_finding(&["ProcessStartRule", "Shell32Rule"]) {
            Severity::Critical
        } else if ctx.has_any_finding(&["AssemblyDynamicLoadRule", "PersistenceRule"]) {
            Severity::High
        } else {
            return Vec::new();
        };
        let offset = ctx.min_offset_of(&["DllImportRule", "Shell32Rule", "ProcessStartRule", "AssemblyDynamicLoadRule", "PersistenceRule"]);
        vec![deep_finding(
            "DeepNativeInteropCorrelationRule",
            ctx,
            offset,
            severity,
            "A native-interop declaration is directly followed by a sink in the same method".into(),
        )]
    }
}

pub struct ScriptHostLaunchAnalyzer;

const SCRIPT_HOST_INDICATORS: &[&str] = &["powershell", "cmd.exe", "mshta", "wscript", "cscript", "rundll32", "regsvr32"];
const ENCODED_LAUNCH_INDICATORS: &[&str] = &["-enc", "-encodedcommand", "convert.frombase64string", "/c", "iex"];

impl DeepAnalyzer for ScriptHostLaunchAnalyzer {
    fn id(&self) -> &'static str {
        "ScriptHostLaunchAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_script_host_launch
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_finding("ProcessStartRule") || !ctx.has_any_literal_containing(SCRIPT_HOST_INDICATORS) {
            return Vec::new();
        }
        let severity = if ctx.has_any_literal_containing(ENCODED_LAUNCH_INDICATORS) {
            Severity::Critical
        } else {
            Severity::High
        };
        let offset = ctx.min_offset_of(&["ProcessStartRule"]);
        vec![deep_finding(
            "DeepScriptHostLaunchRule",
            ctx,
            offset,
            severity,
            "Launches a known script-host interpreter with an indicator literal present in the same method".into(),
        )]
    }
}

pub struct ExecutionChainAnalyzer;

impl DeepAnalyzer for ExecutionChainAnalyzer {
    fn id(&self) -> &'static str {
        "ExecutionChainAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_execution_chain
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_finding("ProcessStartRule") {
            return Vec::new();
        }
        let seed_severity = Severity::Critical;
        let severity = if ctx.has_finding("EnvironmentPathRule") { escalate(seed_severity) } else { seed_severity };
        let offset = ctx.min_offset_of(&["ProcessStartRule"]);
        vec![deep_finding(
            "DeepExecutionChainRule",
            ctx,
            offset,
            severity,
            "A process launch participates in a broader execution chain with environment manipulation".into(),
        )]
    }
}

pub struct DynamicLoadCorrelationAnalyzer;

impl DeepAnalyzer for DynamicLoadCorrelationAnalyzer {
    fn id(&self) -> &'static str {
        "DynamicLoadCorrelationAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_dynamic_load_correlation
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_finding("AssemblyDynamicLoadRule") {
            return Vec::new();
        }
        let seed_severity = Severity::Critical;
        let severity = if ctx.has_finding("ReflectionRule") { escalate(seed_severity) } else { seed_severity };
        let offset = ctx.min_offset_of(&["AssemblyDynamicLoadRule"]);
        vec![deep_finding(
            "DeepDynamicLoadCorrelationRule",
            ctx,
            offset,
            severity,
            "Dynamic assembly loading correlates with a reflective invocation in the same method".into(),
        )]
    }
}

pub struct ResourcePayloadAnalyzer;

impl DeepAnalyzer for ResourcePayloadAnalyzer {
    fn id(&self) -> &'static str {
        "ResourcePayloadAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_resource_payload
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_finding("DataFlowAnalysis") {
            return Vec::new();
        }
        let seed_severity = Severity::High;
        let severity = if ctx.has_any_finding(&["EncodedStringPipelineRule", "EncodedBlobSplittingRule"]) {
            escalate(seed_severity)
        } else {
            seed_severity
        };
        let offset = ctx.min_offset_of(&["DataFlowAnalysis"]);
        vec![deep_finding(
            "DeepResourcePayloadRule",
            ctx,
            offset,
            severity,
            "An embedded-resource data flow correlates with an additional payload-decoding step".into(),
        )]
    }
}

pub struct StringDecodeFlowAnalyzer;

impl DeepAnalyzer for StringDecodeFlowAnalyzer {
    fn id(&self) -> &'static str {
        "StringDecodeFlowAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_string_decode_flow
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_any_finding(&["Base64Rule", "HexStringRule", "EncodedStringLiteralRule"]) {
            return Vec::new();
        }
        let seed_severity = Severity::Medium;
        let severity = if ctx.has_any_finding(&["EncodedStringPipelineRule", "EncodedBlobSplittingRule"]) {
            escalate(seed_severity)
        } else {
            seed_severity
        };
        let offset = ctx.min_offset_of(&["Base64Rule", "HexStringRule", "EncodedStringLiteralRule"]);
        vec![deep_finding(
            "DeepStringDecodeFlowRule",
            ctx,
            offset,
            severity,
            "An encoded string literal feeds a multi-step decode pipeline in this method".into(),
        )]
    }
}

pub struct EnvironmentPivotAnalyzer;

impl DeepAnalyzer for EnvironmentPivotAnalyzer {
    fn id(&self) -> &'static str {
        "EnvironmentPivotAnalyzer"
    }

    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool {
        config.enable_environment_pivot
    }

    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        if !ctx.has_finding("EnvironmentPathRule") {
            return Vec::new();
        }
        let seed_severity = Severity::High;
        let severity = if ctx.has_finding("ProcessStartRule") { escalate(seed_severity) } else { seed_severity };
        let offset = ctx.min_offset_of(&["EnvironmentPathRule"]);
        vec![deep_finding(
            "DeepEnvironmentPivotRule",
            ctx,
            offset,
            severity,
            "PATH manipulation correlates with a subsequent process launch, hijacking resolution".into(),
        )]
    }
}

/// The fixed order the orchestrator runs analyzers in (§4.9).
pub fn default_bank() -> Vec<Box<dyn DeepAnalyzer>> {
    vec![
        Box::new(NativeInteropCorrelationAnalyzer),
        Box::new(ExecutionChainAnalyzer),
        Box::new(StringDecodeFlowAnalyzer),
        Box::new(ResourcePayloadAnalyzer),
        Box::new(DynamicLoadCorrelationAnalyzer),
        Box::new(ScriptHostLaunchAnalyzer),
        Box::new(EnvironmentPivotAnalyzer),
    ]
}
