use serde::{Deserialize, Serialize};

use crate::types::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyRole {
    Mod,
    Plugin,
    UserLib,
    Patcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepEdgeType {
    Reference,
    CallEvidence,
    ResourceLoad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepNode {
    pub path: String,
    pub name: String,
    pub role: AssemblyRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepEdge {
    pub source: String,
    pub target: String,
    pub edge_type: DepEdgeType,
    pub evidence: String,
}

/// Dependency graph over a batch of target assemblies, built by the
/// cross-assembly graph builder and consumed by the risk propagator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyDependencyGraph {
    pub nodes: Vec<DepNode>,
    pub edges: Vec<DepEdge>,
}

impl AssemblyDependencyGraph {
    pub fn callers_of<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a DepEdge> {
        self.edges.iter().filter(move |e| e.target == target)
    }

    pub fn has_inbound_edge(&self, target: &str) -> bool {
        self.edges.iter().any(|e| e.target == target)
    }
}

/// A node in a consolidated `CallChain`: where the reachability path starts,
/// passes through, and ends at a suspicious declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallChainNode {
    EntryPoint(String),
    IntermediateCall(String),
    SuspiciousDeclaration(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallChain {
    pub chain_id: String,
    pub rule_id: String,
    pub summary: String,
    pub severity: Severity,
    pub nodes: Vec<CallChainNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFlowPattern {
    DownloadAndExecute,
    DataExfiltration,
    DynamicCodeLoading,
    CredentialTheft,
    RemoteConfigLoad,
    ObfuscatedPersistence,
}

impl DataFlowPattern {
    pub fn severity(&self) -> Severity {
        match self {
            DataFlowPattern::DownloadAndExecute => Severity::Critical,
            DataFlowPattern::DataExfiltration => Severity::High,
            DataFlowPattern::DynamicCodeLoading => Severity::High,
            DataFlowPattern::CredentialTheft => Severity::Critical,
            DataFlowPattern::RemoteConfigLoad => Severity::Medium,
            DataFlowPattern::ObfuscatedPersistence => Severity::High,
        }
    }

    pub fn min_confidence(&self) -> f64 {
        match self {
            DataFlowPattern::DownloadAndExecute => 0.8,
            DataFlowPattern::DataExfiltration => 0.7,
            DataFlowPattern::DynamicCodeLoading => 0.7,
            DataFlowPattern::CredentialTheft => 0.8,
            DataFlowPattern::RemoteConfigLoad => 0.5,
            DataFlowPattern::ObfuscatedPersistence => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFlowNodeKind {
    Source,
    Transform,
    Sink,
    Intermediate,
}

/// A classified event along an intra-procedural (or cross-method) data flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFlowEvent {
    NetworkSource,
    FileReadSource,
    ResourceLoadSource,
    HardcodedLiteralSource,
    BrowserDataRead,
    RegistryRead,
    Base64Transform,
    HexTransform,
    DecryptTransform,
    DecompressTransform,
    FileWriteSink,
    ProcessStartSink,
    NetworkSendSink,
    AssemblyLoadSink,
    ConfigParseSink,
    RegistryWriteSink,
    StartupWriteSink,
    PassThrough,
}

impl DataFlowEvent {
    pub fn kind(&self) -> DataFlowNodeKind {
        use DataFlowEvent::*;
        match self {
            NetworkSource | FileReadSource | ResourceLoadSource | HardcodedLiteralSource
            | BrowserDataRead | RegistryRead => DataFlowNodeKind::Source,
            Base64Transform | HexTransform | DecryptTransform | DecompressTransform => {
                DataFlowNodeKind::Transform
            }
            FileWriteSink | ProcessStartSink | NetworkSendSink | AssemblyLoadSink
            | ConfigParseSink | RegistryWriteSink | StartupWriteSink => DataFlowNodeKind::Sink,
            PassThrough => DataFlowNodeKind::Intermediate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowNode {
    pub event: DataFlowEvent,
    pub method: String,
    pub offset: u32,
    pub detail: String,
}

impl DataFlowNode {
    pub fn kind(&self) -> DataFlowNodeKind {
        self.event.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowChain {
    pub chain_id: String,
    pub pattern: DataFlowPattern,
    pub severity: Severity,
    pub confidence: f64,
    pub nodes: Vec<DataFlowNode>,
    pub cross_method: bool,
    pub involved_methods: Vec<String>,
}

/// Developer-facing remediation guidance attached to a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperGuidance {
    pub remediation: String,
    pub doc_url: Option<String>,
    pub alternative_apis: Vec<String>,
    pub is_remediable: bool,
}

/// One static-analysis finding. `rule_id`/`location`/`description`/`severity`
/// make up the deduplication key (stable string concatenation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFinding {
    pub rule_id: String,
    pub location: String,
    pub description: String,
    pub severity: Severity,
    pub snippet: Option<String>,
    pub call_chain: Option<CallChain>,
    pub data_flow_chain: Option<DataFlowChain>,
    pub bypass_companion: bool,
    pub risk_score: Option<f64>,
    pub developer_guidance: Option<DeveloperGuidance>,
}

impl ScanFinding {
    pub fn dedup_key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.rule_id, self.location, self.description, self.severity
        )
    }
}
