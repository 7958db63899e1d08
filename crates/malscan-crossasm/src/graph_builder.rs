use std::collections::HashSet;
use std::path::Path;

use malscan_core::{Assembly, AssemblyDependencyGraph, AssemblyRole, DepEdge, DepEdgeType, DepNode};

/// One assembly submitted to a batch cross-assembly scan, tagged with its
/// role in the mod-loading topology (§4.11).
pub struct BatchTarget<'a> {
    pub path: &'a Path,
    pub assembly: &'a Assembly,
    pub role: AssemblyRole,
}

/// Builds the `AssemblyDependencyGraph` for a batch of targets: one node per
/// target plus one `Reference` edge per assembly-reference that resolves to
/// another target's simple name. Runs single-threaded, after every
/// per-assembly scan in the batch has already completed (§5).
pub fn build_dependency_graph(targets: &[BatchTarget<'_>]) -> AssemblyDependencyGraph {
    let nodes: Vec<DepNode> = targets
        .iter()
        .map(|t| DepNode { path: canonical_path(t.path), name: simple_name(t.path), role: t.role })
        .collect();

    let mut edges = Vec::new();
    let mut seen: HashSet<(String, String, DepEdgeType)> = HashSet::new();

    for (i, target) in targets.iter().enumerate() {
        let source = canonical_path(target.path);
        for module in &target.assembly.modules {
            for reference in &module.assembly_refs {
                let Some(resolved) = resolve_reference(reference, targets) else { continue };
                if resolved == i {
                    continue;
                }
                let dest = canonical_path(targets[resolved].path);
                let key = (source.clone(), dest.clone(), DepEdgeType::Reference);
                if seen.insert(key) {
                    edges.push(DepEdge {
                        source: source.clone(),
                        target: dest,
                        edge_type: DepEdgeType::Reference,
                        evidence: format!("assembly reference {reference}"),
                    });
                }
            }
        }
    }

    AssemblyDependencyGraph { nodes, edges }
}

fn resolve_reference(reference: &str, targets: &[BatchTarget<'_>]) -> Option<usize> {
    targets.iter().position(|t| simple_name(t.path).eq_ignore_ascii_case(reference))
}

fn simple_name(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Canonicalizes and case-folds a path so the same assembly reached via a
/// relative path, an absolute path, or a different case (common on
/// Windows-sourced mod folders) resolves to the same graph/map key (§3).
/// Falls back to a lower-cased lossy string when the path doesn't exist on
/// disk, which keeps this usable against the synthetic paths batch callers
/// (and this module's own tests) construct without touching the filesystem.
pub fn canonical_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_else(|_| path.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use malscan_core::Module;

    fn assembly_with_refs(refs: Vec<&str>) -> Assembly {
        Assembly {
            virtual_path: "test".into(),
            size_bytes: 0,
            sha256: "0".repeat(64),
            modules: vec![Module {
                name: "test".into(),
                types: Vec::new(),
                resources: Vec::new(),
                assembly_refs: refs.into_iter().map(String::from).collect(),
            }],
        }
    }

    #[test]
    fn reference_between_two_batch_targets_becomes_an_edge() {
        let a = assembly_with_refs(vec!["Helper"]);
        let b = assembly_with_refs(vec![]);
        let targets = vec![
            BatchTarget { path: Path::new("Mod.dll"), assembly: &a, role: AssemblyRole::Mod },
            BatchTarget { path: Path::new("Helper.dll"), assembly: &b, role: AssemblyRole::UserLib },
        ];

        let graph = build_dependency_graph(&targets);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "mod.dll");
        assert_eq!(graph.edges[0].target, "helper.dll");
    }

    #[test]
    fn self_reference_is_dropped() {
        let a = assembly_with_refs(vec!["Mod"]);
        let targets = vec![BatchTarget { path: Path::new("Mod.dll"), assembly: &a, role: AssemblyRole::Mod }];

        let graph = build_dependency_graph(&targets);

        assert!(graph.edges.is_empty());
    }

    #[test]
    fn duplicate_references_are_deduplicated() {
        let a = assembly_with_refs(vec!["Helper", "Helper"]);
        let b = assembly_with_refs(vec![]);
        let targets = vec![
            BatchTarget { path: Path::new("Mod.dll"), assembly: &a, role: AssemblyRole::Mod },
            BatchTarget { path: Path::new("Helper.dll"), assembly: &b, role: AssemblyRole::UserLib },
        ];

        let graph = build_dependency_graph(&targets);

        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn unresolved_reference_outside_the_batch_is_ignored() {
        let a = assembly_with_refs(vec!["System.Core"]);
        let targets = vec![BatchTarget { path: Path::new("Mod.dll"), assembly: &a, role: AssemblyRole::Mod }];

        let graph = build_dependency_graph(&targets);

        assert!(graph.edges.is_empty());
    }

    #[test]
    fn canonical_path_is_case_folded() {
        let lower = canonical_path(Path::new("mods/helper.dll"));
        let upper = canonical_path(Path::new("Mods/Helper.DLL"));
        assert_eq!(lower, upper);
    }
}
