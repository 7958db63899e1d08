use std::sync::Arc;

use malscan_core::{Assembly, ScanConfig, ScanFinding};
use malscan_rules::RuleRegistry;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::call_graph::CallGraphBuilder;
use crate::data_flow::analyze_data_flow;
use crate::deep_behavior::{method_selected_for_deep_analysis, DeepAnalysisContext, DeepBehaviorOrchestrator};
use crate::exception_handlers::analyze_exception_handlers;
use crate::instruction_analyzer::{flush_pending_reflections, InstructionAnalyzer, PendingReflection};
use crate::local_variables::{analyze_locals, has_suspicious_locals};
use crate::pinvoke_scanner::scan_pinvoke_declarations;
use crate::signal_tracker::SignalTracker;

/// Orchestrates the whole per-assembly pipeline (§4.12): P/Invoke scan,
/// instruction analysis, exception-handler analysis, data-flow analysis,
/// call-graph consolidation, deep-behavior correlation, and pending
/// reflection flush. Single-threaded per assembly (§5) — callers wanting
/// parallelism across assemblies shard at a higher level (`malscan-api`).
pub struct AssemblyScanner {
    registry: Arc<RuleRegistry>,
    config: ScanConfig,
}

impl AssemblyScanner {
    pub fn new(registry: Arc<RuleRegistry>, config: ScanConfig) -> Self {
        Self { registry, config }
    }

    #[instrument(skip_all, fields(virtual_path = %assembly.virtual_path))]
    pub fn scan(&self, assembly: &Assembly) -> Vec<ScanFinding> {
        let mut tracker = SignalTracker::new();
        let mut call_graph = CallGraphBuilder::new();
        let mut pending_reflections: Vec<PendingReflection> = Vec::new();
        let mut findings = Vec::new();

        let analyzer = InstructionAnalyzer::new(&self.registry, &self.config);

        for module in &assembly.modules {
            let all_methods: Vec<&malscan_core::Method> =
                module.types.iter().flat_map(|t| t.methods.iter()).collect();

            scan_pinvoke_declarations(&all_methods, &self.registry, &mut call_graph);

            for cil_type in &module.types {
                let method_keys: Vec<_> = cil_type.methods.iter().map(|m| m.key.clone()).collect();

                for method in &cil_type.methods {
                    if !method.has_body() {
                        continue;
                    }

                    findings.extend(analyzer.analyze_method(method, &mut tracker, &mut call_graph, &mut pending_reflections));

                    if self.config.analyze_exception_handlers {
                        findings.extend(analyze_exception_handlers(method));
                    }

                    if self.config.analyze_local_variables {
                        if has_suspicious_locals(method) {
                            tracker.method_signals_mut(&method.key).suspicious_local_variables = true;
                        }
                        if let Some(finding) = analyze_locals(method, &self.registry) {
                            findings.push(finding);
                        }
                    }

                    findings.extend(analyze_data_flow(method, new_chain_id));

                    tracker.recompute_type_signals(&cil_type.full_name, &method_keys);
                }
            }
        }

        findings.extend(call_graph.consolidate(new_chain_id));
        findings.extend(flush_pending_reflections(pending_reflections, &tracker));

        if self.config.deep_analysis.enable_deep_analysis {
            findings.extend(self.run_deep_analysis(assembly, &findings, &tracker));
        }

        let findings = dedup_and_order(findings);
        debug!(finding_count = findings.len(), "assembly scan complete");
        findings
    }

    fn run_deep_analysis(&self, assembly: &Assembly, base_findings: &[ScanFinding], tracker: &SignalTracker) -> Vec<ScanFinding> {
        let orchestrator = DeepBehaviorOrchestrator::with_default_bank();
        let mut deep_findings = Vec::new();
        let mut selected = 0usize;

        'assembly: for module in &assembly.modules {
            for cil_type in &module.types {
                for method in &cil_type.methods {
                    if !method.has_body() {
                        continue;
                    }
                    if self.config.deep_analysis.deep_scan_only_flagged_methods
                        && method.instructions.len() > self.config.deep_analysis.max_instructions_per_method
                    {
                        continue;
                    }

                    let method_findings: Vec<ScanFinding> = base_findings
                        .iter()
                        .filter(|f| f.location.starts_with(method.key.as_str()))
                        .cloned()
                        .collect();
                    let signals = tracker.method_signals(&method.key);

                    if !method_selected_for_deep_analysis(method, &method_findings, &signals) {
                        continue;
                    }
                    if selected >= self.config.deep_analysis.max_deep_methods_per_assembly {
                        break 'assembly;
                    }
                    selected += 1;

                    let ctx = DeepAnalysisContext {
                        method,
                        base_findings: &method_findings,
                        signals: &signals,
                        config: &self.config.deep_analysis,
                    };
                    deep_findings.extend(orchestrator.run(&ctx));
                }
            }
        }

        deep_findings
    }
}

fn new_chain_id() -> String {
    Uuid::new_v4().to_string()
}

fn dedup_and_order(findings: Vec<ScanFinding>) -> Vec<ScanFinding> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<ScanFinding> = findings.into_iter().filter(|f| seen.insert(f.dedup_key())).collect();
    deduped.sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.rule_id.cmp(&b.rule_id)));
    deduped
}
