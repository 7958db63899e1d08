use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use malscan_core::{CallChain, CallChainNode, DeveloperGuidance, MethodKey, ScanFinding, Severity};
use rustc_hash::FxHasher;

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Metadata recorded when a suspicious declaration (P/Invoke import, or any
/// other declaration-time suspicious method) is registered.
#[derive(Debug, Clone)]
pub struct SuspiciousDeclInfo {
    pub rule_id: String,
    pub severity: Severity,
    pub description: String,
    pub developer_guidance: Option<DeveloperGuidance>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: MethodKey,
    pub offset: u32,
    pub snippet: Option<String>,
}

/// Consolidates call-sites into suspicious declarations into single
/// `CallChain` findings (§4.5). Represented as two key-indexed maps, never
/// a graph of reference-linked nodes.
#[derive(Default)]
pub struct CallGraphBuilder {
    suspicious_decl: FxHashMap<MethodKey, SuspiciousDeclInfo>,
    call_sites: FxHashMap<MethodKey, Vec<CallSite>>,
}

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_declaration(&mut self, key: MethodKey, info: SuspiciousDeclInfo) {
        self.suspicious_decl.insert(key, info);
    }

    pub fn is_suspicious_method(&self, key: &MethodKey) -> bool {
        self.suspicious_decl.contains_key(key)
    }

    pub fn declaration_info(&self, key: &MethodKey) -> Option<&SuspiciousDeclInfo> {
        self.suspicious_decl.get(key)
    }

    pub fn register_call_site(&mut self, key: &MethodKey, site: CallSite) {
        self.call_sites.entry(key.clone()).or_default().push(site);
    }

    /// Produces one `ScanFinding` per registered declaration: a consolidated
    /// `CallChain` finding when at least one call-site was registered, or a
    /// standalone declaration finding otherwise.
    pub fn consolidate(&self, chain_id_factory: impl Fn() -> String) -> Vec<ScanFinding> {
        let mut findings = Vec::new();
        let mut decls: Vec<_> = self.suspicious_decl.iter().collect();
        decls.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        for (decl_key, info) in decls {
            match self.call_sites.get(decl_key) {
                Some(sites) if !sites.is_empty() => {
                    let mut callers: Vec<&MethodKey> = sites.iter().map(|s| &s.caller).collect();
                    callers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                    callers.dedup();

                    let mut nodes: Vec<CallChainNode> =
                        callers.iter().map(|c| CallChainNode::EntryPoint(c.as_str().to_string())).collect();
                    nodes.push(CallChainNode::SuspiciousDeclaration(decl_key.as_str().to_string()));

                    let chain = CallChain {
                        chain_id: chain_id_factory(),
                        rule_id: info.rule_id.clone(),
                        summary: format!(
                            "{} is called from {} location(s) in this assembly",
                            decl_key.as_str(),
                            callers.len()
                        ),
                        severity: info.severity,
                        nodes,
                    };

                    let first_site = &sites[0];
                    let snippet = match (&info.snippet, &first_site.snippet) {
                        (Some(decl), Some(call)) => Some(format!("{decl}\n---\n{call}")),
                        (Some(decl), None) => Some(decl.clone()),
                        (None, Some(call)) => Some(call.clone()),
                        (None, None) => None,
                    };

                    findings.push(ScanFinding {
                        rule_id: info.rule_id.clone(),
                        location: decl_key.as_str().to_string(),
                        description: info.description.clone(),
                        severity: info.severity,
                        snippet,
                        call_chain: Some(chain),
                        data_flow_chain: None,
                        bypass_companion: true,
                        risk_score: None,
                        developer_guidance: info.developer_guidance.clone(),
                    });
                }
                _ => {
                    findings.push(ScanFinding {
                        rule_id: info.rule_id.clone(),
                        location: decl_key.as_str().to_string(),
                        description: info.description.clone(),
                        severity: info.severity,
                        snippet: info.snippet.clone(),
                        call_chain: None,
                        data_flow_chain: None,
                        bypass_companion: true,
                        risk_score: None,
                        developer_guidance: info.developer_guidance.clone(),
                    });
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl_info() -> SuspiciousDeclInfo {
        SuspiciousDeclInfo {
            rule_id: "Shell32Rule".into(),
            severity: Severity::Critical,
            description: "test decl".into(),
            developer_guidance: None,
            snippet: None,
        }
    }

    #[test]
    fn declaration_without_call_site_is_standalone() {
        let mut builder = CallGraphBuilder::new();
        builder.register_declaration(MethodKey::new("A", "Native"), decl_info());
        let findings = builder.consolidate(|| "chain-1".to_string());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].call_chain.is_none());
    }

    #[test]
    fn declaration_with_one_call_site_consolidates_to_two_nodes() {
        let mut builder = CallGraphBuilder::new();
        let decl_key = MethodKey::new("A", "Native");
        builder.register_declaration(decl_key.clone(), decl_info());
        builder.register_call_site(
            &decl_key,
            CallSite { caller: MethodKey::new("B", "Caller"), offset: 4, snippet: None },
        );

        let findings = builder.consolidate(|| "chain-1".to_string());
        assert_eq!(findings.len(), 1);
        let chain = findings[0].call_chain.as_ref().unwrap();
        assert_eq!(chain.nodes.len(), 2);
    }
}
