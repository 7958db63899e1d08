use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use malscan_core::{CallChain, CallChainNode, DataFlowChain, DataFlowNode, DeveloperGuidance, ScanFinding, Severity};

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChainDto {
    pub chain_id: String,
    pub rule_id: String,
    pub summary: String,
    pub severity: Severity,
    pub nodes: Vec<CallChainNode>,
}

impl From<&CallChain> for CallChainDto {
    fn from(chain: &CallChain) -> Self {
        Self {
            chain_id: chain.chain_id.clone(),
            rule_id: chain.rule_id.clone(),
            summary: chain.summary.clone(),
            severity: chain.severity,
            nodes: chain.nodes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowChainDto {
    pub chain_id: String,
    pub pattern: String,
    pub severity: Severity,
    pub confidence: f64,
    pub nodes: Vec<DataFlowNode>,
    pub cross_method: bool,
    pub involved_methods: Vec<String>,
}

impl From<&DataFlowChain> for DataFlowChainDto {
    fn from(chain: &DataFlowChain) -> Self {
        Self {
            chain_id: chain.chain_id.clone(),
            pattern: format!("{:?}", chain.pattern),
            severity: chain.severity,
            confidence: chain.confidence,
            nodes: chain.nodes.clone(),
            cross_method: chain.cross_method,
            involved_methods: chain.involved_methods.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingDto {
    pub id: String,
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
    pub location: String,
    pub code_snippet: Option<String>,
    pub call_chain: Option<CallChainDto>,
    pub data_flow_chain: Option<DataFlowChainDto>,
}

impl From<&ScanFinding> for FindingDto {
    fn from(finding: &ScanFinding) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_id: finding.rule_id.clone(),
            description: finding.description.clone(),
            severity: finding.severity,
            location: finding.location.clone(),
            code_snippet: finding.snippet.clone(),
            call_chain: finding.call_chain.as_ref().map(CallChainDto::from),
            data_flow_chain: finding.data_flow_chain.as_ref().map(DataFlowChainDto::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInput {
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub core_version: String,
    pub platform_version: String,
    pub timestamp: DateTime<Utc>,
    pub scan_mode: String,
    pub platform: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub total_findings: usize,
    pub count_by_severity: BTreeMap<String, usize>,
    pub triggered_rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub schema_version: String,
    pub metadata: ScanMetadata,
    pub input: ScanInput,
    pub summary: ScanSummary,
    pub findings: Vec<FindingDto>,
    pub call_chains: Vec<CallChainDto>,
    pub data_flows: Vec<DataFlowChainDto>,
    pub developer_guidance: Vec<DeveloperGuidance>,
}

/// Builds the v1.0.0 `ScanResult` document from a raw finding set (§6). The
/// engine crates never derive `Serialize` on their own analysis state —
/// only this DTO layer is serialized.
pub fn from_findings(
    file_name: &str,
    size_bytes: u64,
    sha256_hash: String,
    scan_mode: &str,
    timestamp: DateTime<Utc>,
    findings: &[ScanFinding],
) -> ScanResult {
    let finding_dtos: Vec<FindingDto> = findings.iter().map(FindingDto::from).collect();

    let mut count_by_severity: BTreeMap<String, usize> = BTreeMap::new();
    for finding in findings {
        *count_by_severity.entry(finding.severity.to_string()).or_insert(0) += 1;
    }

    let mut triggered_rules: Vec<String> = findings.iter().map(|f| f.rule_id.clone()).collect();
    triggered_rules.sort();
    triggered_rules.dedup();

    let call_chains: Vec<CallChainDto> = findings.iter().filter_map(|f| f.call_chain.as_ref()).map(CallChainDto::from).collect();
    let data_flows: Vec<DataFlowChainDto> =
        findings.iter().filter_map(|f| f.data_flow_chain.as_ref()).map(DataFlowChainDto::from).collect();

    let mut seen_remediations = std::collections::HashSet::new();
    let developer_guidance: Vec<DeveloperGuidance> = findings
        .iter()
        .filter_map(|f| f.developer_guidance.clone())
        .filter(|g| seen_remediations.insert(g.remediation.clone()))
        .collect();

    ScanResult {
        schema_version: SCHEMA_VERSION.to_string(),
        metadata: ScanMetadata {
            core_version: env!("CARGO_PKG_VERSION").to_string(),
            platform_version: std::env::consts::OS.to_string(),
            timestamp,
            scan_mode: scan_mode.to_string(),
            platform: std::env::consts::ARCH.to_string(),
        },
        input: ScanInput { file_name: file_name.to_string(), size_bytes, sha256_hash },
        summary: ScanSummary { total_findings: finding_dtos.len(), count_by_severity, triggered_rules },
        findings: finding_dtos,
        call_chains,
        data_flows,
        developer_guidance,
    }
}

pub fn to_json(result: &ScanResult) -> malscan_core::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use malscan_core::Severity;

    fn finding(severity: Severity) -> ScanFinding {
        ScanFinding {
            rule_id: "ProcessStartRule".into(),
            location: "N.M:0".into(),
            description: "d".into(),
            severity,
            snippet: None,
            call_chain: None,
            data_flow_chain: None,
            bypass_companion: false,
            risk_score: None,
            developer_guidance: None,
        }
    }

    #[test]
    fn empty_finding_set_yields_empty_summary() {
        let result = from_findings("Mod.dll", 1024, "0".repeat(64), "standard", Utc::now(), &[]);
        assert_eq!(result.summary.total_findings, 0);
        assert!(result.summary.count_by_severity.is_empty());
        assert!(result.summary.triggered_rules.is_empty());
    }

    #[test]
    fn severity_counts_and_triggered_rules_are_populated() {
        let findings = vec![finding(Severity::Critical), finding(Severity::Critical), finding(Severity::Low)];
        let result = from_findings("Mod.dll", 1024, "0".repeat(64), "standard", Utc::now(), &findings);
        assert_eq!(result.summary.total_findings, 3);
        assert_eq!(result.summary.count_by_severity.get("Critical"), Some(&2));
        assert_eq!(result.summary.count_by_severity.get("Low"), Some(&1));
        assert_eq!(result.summary.triggered_rules, vec!["ProcessStartRule".to_string()]);
    }

    #[test]
    fn serializes_with_camel_case_schema_fields() {
        let result = from_findings("Mod.dll", 1024, "0".repeat(64), "standard", Utc::now(), &[finding(Severity::High)]);
        let json = to_json(&result).unwrap();
        assert!(json.contains("\"schemaVersion\""));
        assert!(json.contains("\"totalFindings\""));
        assert!(json.contains("\"ruleId\""));
    }
}
