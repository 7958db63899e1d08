use malscan_core::{
    DataFlowChain, DataFlowEvent, DataFlowNode, DataFlowPattern, Method, MethodRef, Operand,
    ScanFinding,
};
use malscan_rules::icontains;

const RULE_ID: &str = "DataFlowAnalysis";
const HARDCODED_LITERAL_MIN_LEN: usize = 24;

type Steps = &'static [&'static [DataFlowEvent]];

const DOWNLOAD_AND_EXECUTE: Steps = &[
    &[DataFlowEvent::NetworkSource],
    &[DataFlowEvent::FileWriteSink],
    &[DataFlowEvent::ProcessStartSink, DataFlowEvent::AssemblyLoadSink],
];

const DATA_EXFILTRATION: Steps = &[
    &[
        DataFlowEvent::FileReadSource,
        DataFlowEvent::BrowserDataRead,
        DataFlowEvent::RegistryRead,
        DataFlowEvent::ResourceLoadSource,
        DataFlowEvent::Base64Transform,
        DataFlowEvent::HexTransform,
    ],
    &[DataFlowEvent::NetworkSendSink],
];

const DYNAMIC_CODE_LOADING: Steps = &[
    &[DataFlowEvent::HardcodedLiteralSource, DataFlowEvent::Base64Transform, DataFlowEvent::HexTransform],
    &[DataFlowEvent::AssemblyLoadSink],
];

const CREDENTIAL_THEFT: Steps = &[
    &[DataFlowEvent::BrowserDataRead, DataFlowEvent::RegistryRead],
    &[
        DataFlowEvent::Base64Transform,
        DataFlowEvent::HexTransform,
        DataFlowEvent::DecryptTransform,
        DataFlowEvent::DecompressTransform,
    ],
    &[DataFlowEvent::NetworkSendSink],
];

const REMOTE_CONFIG_LOAD: Steps = &[&[DataFlowEvent::NetworkSource], &[DataFlowEvent::ConfigParseSink]];

const OBFUSCATED_PERSISTENCE: Steps = &[
    &[
        DataFlowEvent::Base64Transform,
        DataFlowEvent::HexTransform,
        DataFlowEvent::DecryptTransform,
        DataFlowEvent::DecompressTransform,
    ],
    &[DataFlowEvent::RegistryWriteSink, DataFlowEvent::StartupWriteSink],
];

const PATTERNS: &[(DataFlowPattern, Steps)] = &[
    (DataFlowPattern::DownloadAndExecute, DOWNLOAD_AND_EXECUTE),
    (DataFlowPattern::CredentialTheft, CREDENTIAL_THEFT),
    (DataFlowPattern::DataExfiltration, DATA_EXFILTRATION),
    (DataFlowPattern::DynamicCodeLoading, DYNAMIC_CODE_LOADING),
    (DataFlowPattern::RemoteConfigLoad, REMOTE_CONFIG_LOAD),
    (DataFlowPattern::ObfuscatedPersistence, OBFUSCATED_PERSISTENCE),
];

/// Intra-procedural source/transform/sink trace over a single method's
/// instructions, matched against the pattern table in §4.6.
pub fn analyze_data_flow(method: &Method, chain_id_factory: impl Fn() -> String) -> Vec<ScanFinding> {
    let events = classify_events(method);
    if events.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    let mut already_matched: Vec<(DataFlowPattern, usize, usize)> = Vec::new();

    for (pattern, steps) in PATTERNS {
        let Some(indices) = match_sequence(&events, steps) else { continue };
        let first = *indices.first().unwrap();
        let last = *indices.last().unwrap();

        if already_matched.iter().any(|(_, f, l)| *f == first && *l == last) {
            continue;
        }
        already_matched.push((*pattern, first, last));

        let nodes = events[first..=last].to_vec();
        let chain = DataFlowChain {
            chain_id: chain_id_factory(),
            pattern: *pattern,
            severity: pattern.severity(),
            confidence: pattern.min_confidence(),
            nodes,
            cross_method: false,
            involved_methods: vec![method.key.as_str().to_string()],
        };

        findings.push(ScanFinding {
            rule_id: RULE_ID.to_string(),
            location: format!("{}:{}", method.key, events[first].offset),
            description: format!("Instruction sequence matches the {pattern:?} data-flow pattern"),
            severity: chain.severity,
            snippet: None,
            call_chain: None,
            data_flow_chain: Some(chain),
            bypass_companion: true,
            risk_score: Some(pattern.min_confidence()),
            developer_guidance: None,
        });
    }

    findings
}

fn match_sequence(events: &[DataFlowNode], steps: Steps) -> Option<Vec<usize>> {
    let mut result = Vec::with_capacity(steps.len());
    let mut start = 0usize;
    for step in steps {
        let rel = events[start..].iter().position(|n| step.contains(&n.event))?;
        let idx = start + rel;
        result.push(idx);
        start = idx + 1;
    }
    Some(result)
}

fn classify_events(method: &Method) -> Vec<DataFlowNode> {
    let mut events = Vec::new();
    for instr in &method.instructions {
        if let Some(callee) = instr.method_ref() {
            if let Some(event) = classify_call(callee) {
                events.push(DataFlowNode {
                    event,
                    method: method.key.as_str().to_string(),
                    offset: instr.offset,
                    detail: callee.full_name(),
                });
            }
        } else if let Operand::String(literal) = &instr.operand {
            if literal.len() >= HARDCODED_LITERAL_MIN_LEN {
                events.push(DataFlowNode {
                    event: DataFlowEvent::HardcodedLiteralSource,
                    method: method.key.as_str().to_string(),
                    offset: instr.offset,
                    detail: literal.clone(),
                });
            }
        }
    }
    events
}

fn classify_call(callee: &MethodRef) -> Option<DataFlowEvent> {
    use DataFlowEvent::*;

    if icontains(&callee.declaring_type, "HttpClient")
        && matches!(callee.name.as_str(), "GetAsync" | "GetByteArrayAsync" | "GetStringAsync" | "GetStreamAsync")
    {
        return Some(NetworkSource);
    }
    if icontains(&callee.declaring_type, "WebClient")
        && matches!(callee.name.as_str(), "DownloadData" | "DownloadFile" | "DownloadString")
    {
        return Some(NetworkSource);
    }
    if icontains(&callee.declaring_type, "System.IO.File")
        && matches!(callee.name.as_str(), "ReadAllBytes" | "ReadAllText" | "ReadAllLines")
    {
        return Some(FileReadSource);
    }
    if icontains(&callee.declaring_type, "Assembly") && callee.name == "GetManifestResourceStream" {
        return Some(ResourceLoadSource);
    }
    if icontains(&callee.declaring_type, "RegistryKey") && callee.name == "GetValue" {
        return Some(RegistryRead);
    }

    if icontains(&callee.declaring_type, "Convert") && callee.name == "FromBase64String" {
        return Some(Base64Transform);
    }
    if icontains(&callee.declaring_type, "Convert") && callee.name == "FromHexString" {
        return Some(HexTransform);
    }
    if (icontains(&callee.declaring_type, "CryptoStream") || icontains(&callee.declaring_type, "ICryptoTransform"))
        && matches!(callee.name.as_str(), "Read" | "TransformFinalBlock")
    {
        return Some(DecryptTransform);
    }
    if (icontains(&callee.declaring_type, "GZipStream") || icontains(&callee.declaring_type, "DeflateStream"))
        && callee.name == "Read"
    {
        return Some(DecompressTransform);
    }

    if icontains(&callee.declaring_type, "System.IO.File")
        && matches!(callee.name.as_str(), "WriteAllBytes" | "WriteAllText" | "WriteAllLines")
    {
        return Some(FileWriteSink);
    }
    if icontains(&callee.declaring_type, "System.Diagnostics.Process") && callee.name == "Start" {
        return Some(ProcessStartSink);
    }
    if icontains(&callee.declaring_type, "WebClient")
        && matches!(callee.name.as_str(), "UploadData" | "UploadFile" | "UploadString")
    {
        return Some(NetworkSendSink);
    }
    if icontains(&callee.declaring_type, "HttpClient") && matches!(callee.name.as_str(), "PostAsync" | "PutAsync") {
        return Some(NetworkSendSink);
    }
    if icontains(&callee.declaring_type, "System.Reflection.Assembly")
        && matches!(callee.name.as_str(), "Load" | "LoadFile" | "LoadFrom")
    {
        return Some(AssemblyLoadSink);
    }
    if icontains(&callee.declaring_type, "JsonConvert") || icontains(&callee.declaring_type, "XmlDocument") {
        return Some(ConfigParseSink);
    }
    if icontains(&callee.declaring_type, "RegistryKey") && callee.name == "SetValue" {
        return Some(RegistryWriteSink);
    }

    None
}
