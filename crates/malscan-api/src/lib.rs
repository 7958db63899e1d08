pub mod dto;

use std::collections::HashMap;
use std::path::Path;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{info, instrument};

use malscan_core::{Assembly, AssemblyRole, Result, ScanConfig, ScanFinding};
use malscan_crossasm::{build_dependency_graph, canonical_path, propagate_risk, BatchTarget, PropagationPolicy};
use malscan_engine::AssemblyScanner;
use malscan_il::IlReader;
use malscan_rules::RuleRegistry;

/// A scanned assembly's findings alongside the identity fields (`sizeBytes`,
/// `sha256Hash`) the result DTO's `input` section needs.
pub struct ScannedAssembly {
    pub findings: Vec<ScanFinding>,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Scans one assembly from disk and returns its deduplicated finding set.
pub fn scan(path: &Path, config: ScanConfig) -> Result<ScannedAssembly> {
    let assembly = IlReader::from_path(path)?;
    let scanner = AssemblyScanner::new(RuleRegistry::with_defaults(), config);
    let findings = scanner.scan(&assembly);
    Ok(ScannedAssembly { findings, size_bytes: assembly.size_bytes, sha256: assembly.sha256 })
}

/// Scans an in-memory assembly and returns its deduplicated finding set.
pub fn scan_bytes(bytes: &[u8], virtual_path: Option<&str>, config: ScanConfig) -> Result<ScannedAssembly> {
    let assembly = IlReader::from_bytes(bytes, virtual_path)?;
    let scanner = AssemblyScanner::new(RuleRegistry::with_defaults(), config);
    let findings = scanner.scan(&assembly);
    Ok(ScannedAssembly { findings, size_bytes: assembly.size_bytes, sha256: assembly.sha256 })
}

/// One target handed to [`scan_batch`]: a concrete, already-resolved path and
/// its role in the mod-loading topology.
pub struct ScanTarget<'a> {
    pub path: &'a Path,
    pub role: AssemblyRole,
}

/// Shards one `scan()` call per input path across a `rayon` thread pool
/// (mirroring the teacher's `parallel_language_processor` sharding), collects
/// into a `path -> findings` map, then runs the single-threaded cross-assembly
/// propagation phase (§5).
#[instrument(skip_all, fields(target_count = targets.len()))]
pub fn scan_batch(
    targets: &[ScanTarget<'_>],
    config: &ScanConfig,
    policy: PropagationPolicy,
) -> Result<HashMap<String, ScannedAssembly>> {
    let registry = RuleRegistry::with_defaults();
    let assemblies: Vec<(String, Assembly, AssemblyRole)> = targets
        .iter()
        .map(|t| {
            let assembly = IlReader::from_path(t.path)?;
            Ok((canonical_path(t.path), assembly, t.role))
        })
        .collect::<Result<Vec<_>>>()?;

    let findings_by_path: DashMap<String, Vec<ScanFinding>> = DashMap::new();
    assemblies.par_iter().for_each(|(path, assembly, _role)| {
        let scanner = AssemblyScanner::new(registry.clone(), config.clone());
        let findings = scanner.scan(assembly);
        findings_by_path.insert(path.clone(), findings);
    });

    let mut findings_by_path: HashMap<String, Vec<ScanFinding>> = findings_by_path.into_iter().collect();

    let batch_targets: Vec<BatchTarget<'_>> = assemblies
        .iter()
        .map(|(path, assembly, role)| BatchTarget { path: Path::new(path.as_str()), assembly, role: *role })
        .collect();
    let graph = build_dependency_graph(&batch_targets);

    let cross_assembly_findings = propagate_risk(&graph, &findings_by_path, policy);
    info!(propagated = cross_assembly_findings.len(), "cross-assembly propagation complete");

    for finding in cross_assembly_findings {
        findings_by_path.entry(finding.location.clone()).or_default().push(finding);
    }

    let result = assemblies
        .into_iter()
        .map(|(path, assembly, _role)| {
            let findings = findings_by_path.remove(&path).unwrap_or_default();
            (path, ScannedAssembly { findings, size_bytes: assembly.size_bytes, sha256: assembly.sha256 })
        })
        .collect();
    Ok(result)
}
