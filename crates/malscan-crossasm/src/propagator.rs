use std::collections::{HashMap, HashSet, VecDeque};

use malscan_core::{AssemblyDependencyGraph, ScanFinding, Severity};

const RULE_ID: &str = "CrossAssemblyDependency";

/// How far a high-risk finding on one assembly propagates to the assemblies
/// that reference it (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationPolicy {
    CallerOnly,
    CallerAndCallee,
    DependencyCluster,
}

/// Propagates High/Critical findings across the dependency graph built by
/// [`crate::graph_builder::build_dependency_graph`]. Runs once, after every
/// per-assembly scan in the batch has completed.
pub fn propagate_risk(
    graph: &AssemblyDependencyGraph,
    findings_by_path: &HashMap<String, Vec<ScanFinding>>,
    policy: PropagationPolicy,
) -> Vec<ScanFinding> {
    let suspicious_targets: Vec<&str> = findings_by_path
        .iter()
        .filter(|(_, findings)| findings.iter().any(|f| f.severity >= Severity::High))
        .map(|(path, _)| path.as_str())
        .collect();

    let mut findings = Vec::new();
    let mut dedup: HashSet<(String, String)> = HashSet::new();

    for target in suspicious_targets {
        let callers: Vec<&str> = graph.callers_of(target).map(|e| e.source.as_str()).collect();
        if callers.is_empty() {
            continue;
        }
        let mut covered: HashSet<&str> = HashSet::new();
        covered.insert(target);

        let mut distinct_callers: Vec<&str> = callers.clone();
        distinct_callers.sort_unstable();
        distinct_callers.dedup();

        for caller in &distinct_callers {
            covered.insert(caller);
            push_finding(
                &mut findings,
                &mut dedup,
                caller,
                Severity::High,
                format!("calls into {target}, which has one or more High/Critical findings"),
            );
        }

        if policy == PropagationPolicy::CallerAndCallee || policy == PropagationPolicy::DependencyCluster {
            push_finding(
                &mut findings,
                &mut dedup,
                target,
                Severity::High,
                format!(
                    "actively referenced by {} dependent {}",
                    distinct_callers.len(),
                    if distinct_callers.len() == 1 { "assembly" } else { "assemblies" }
                ),
            );
        }

        if policy == PropagationPolicy::DependencyCluster {
            for reachable in bfs_undirected(graph, target) {
                if covered.contains(reachable) {
                    continue;
                }
                push_finding(
                    &mut findings,
                    &mut dedup,
                    reachable,
                    Severity::Medium,
                    format!("shares a dependency cluster with the high-risk assembly {target}"),
                );
            }
        }
    }

    findings
}

fn push_finding(
    findings: &mut Vec<ScanFinding>,
    dedup: &mut HashSet<(String, String)>,
    location: &str,
    severity: Severity,
    description: String,
) {
    let key = (location.to_string(), description.clone());
    if !dedup.insert(key) {
        return;
    }
    findings.push(ScanFinding {
        rule_id: RULE_ID.to_string(),
        location: location.to_string(),
        description,
        severity,
        snippet: None,
        call_chain: None,
        data_flow_chain: None,
        bypass_companion: true,
        risk_score: None,
        developer_guidance: None,
    });
}

/// Nodes reachable from `start` over the undirected view of the graph,
/// excluding `start` itself.
fn bfs_undirected<'a>(graph: &'a AssemblyDependencyGraph, start: &'a str) -> Vec<&'a str> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        adjacency.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(start);
    let mut reachable = Vec::new();

    while let Some(node) = queue.pop_front() {
        for &neighbor in adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.insert(neighbor) {
                reachable.push(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use malscan_core::{AssemblyRole, DepEdge, DepEdgeType, DepNode};

    fn finding(severity: Severity) -> ScanFinding {
        ScanFinding {
            rule_id: "Shell32Rule".into(),
            location: "N.M:0".into(),
            description: "d".into(),
            severity,
            snippet: None,
            call_chain: None,
            data_flow_chain: None,
            bypass_companion: true,
            risk_score: None,
            developer_guidance: None,
        }
    }

    fn graph_mod_calls_sidecar() -> AssemblyDependencyGraph {
        AssemblyDependencyGraph {
            nodes: vec![
                DepNode { path: "Mod.dll".into(), name: "Mod".into(), role: AssemblyRole::Mod },
                DepNode { path: "Sidecar.dll".into(), name: "Sidecar".into(), role: AssemblyRole::UserLib },
            ],
            edges: vec![DepEdge {
                source: "Mod.dll".into(),
                target: "Sidecar.dll".into(),
                edge_type: DepEdgeType::Reference,
                evidence: "assembly reference Sidecar".into(),
            }],
        }
    }

    #[test]
    fn caller_only_emits_one_finding_on_the_caller() {
        let graph = graph_mod_calls_sidecar();
        let mut by_path = HashMap::new();
        by_path.insert("Sidecar.dll".to_string(), vec![finding(Severity::Critical)]);

        let findings = propagate_risk(&graph, &by_path, PropagationPolicy::CallerOnly);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location, "Mod.dll");
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn caller_and_callee_also_flags_the_sidecar_itself() {
        let graph = graph_mod_calls_sidecar();
        let mut by_path = HashMap::new();
        by_path.insert("Sidecar.dll".to_string(), vec![finding(Severity::High)]);

        let findings = propagate_risk(&graph, &by_path, PropagationPolicy::CallerAndCallee);

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().any(|f| f.location == "Sidecar.dll"));
        assert!(findings.iter().any(|f| f.location == "Mod.dll"));
    }

    #[test]
    fn target_with_no_inbound_edges_produces_nothing() {
        let graph = AssemblyDependencyGraph::default();
        let mut by_path = HashMap::new();
        by_path.insert("Orphan.dll".to_string(), vec![finding(Severity::Critical)]);

        let findings = propagate_risk(&graph, &by_path, PropagationPolicy::DependencyCluster);

        assert!(findings.is_empty());
    }

    #[test]
    fn low_severity_findings_never_trigger_propagation() {
        let graph = graph_mod_calls_sidecar();
        let mut by_path = HashMap::new();
        by_path.insert("Sidecar.dll".to_string(), vec![finding(Severity::Medium)]);

        let findings = propagate_risk(&graph, &by_path, PropagationPolicy::CallerAndCallee);

        assert!(findings.is_empty());
    }

    #[test]
    fn dependency_cluster_reaches_a_third_node_at_medium_severity() {
        let mut graph = graph_mod_calls_sidecar();
        graph.nodes.push(DepNode { path: "Bystander.dll".into(), name: "Bystander".into(), role: AssemblyRole::Mod });
        graph.edges.push(DepEdge {
            source: "Bystander.dll".into(),
            target: "Sidecar.dll".into(),
            edge_type: DepEdgeType::Reference,
            evidence: "assembly reference Sidecar".into(),
        });

        let mut by_path = HashMap::new();
        by_path.insert("Sidecar.dll".to_string(), vec![finding(Severity::Critical)]);

        let findings = propagate_risk(&graph, &by_path, PropagationPolicy::DependencyCluster);

        // Bystander.dll is already a direct caller (High), not a Medium cluster member.
        let bystander = findings.iter().find(|f| f.location == "Bystander.dll").unwrap();
        assert_eq!(bystander.severity, Severity::High);
    }
}
