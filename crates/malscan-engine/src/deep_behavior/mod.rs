mod analyzers;

pub use analyzers::default_bank;

use std::time::{Duration, Instant};

use malscan_core::{DeepAnalysisConfig, Method, MethodSignals, ScanFinding, Severity};

/// Context handed to every `DeepAnalyzer`: the method under analysis, the
/// findings already emitted for it by earlier passes, and its signals.
pub struct DeepAnalysisContext<'a> {
    pub method: &'a Method,
    pub base_findings: &'a [ScanFinding],
    pub signals: &'a MethodSignals,
    pub config: &'a DeepAnalysisConfig,
}

impl<'a> DeepAnalysisContext<'a> {
    pub fn has_finding(&self, rule_id: &str) -> bool {
        self.base_findings.iter().any(|f| f.rule_id == rule_id)
    }

    pub fn has_any_finding(&self, rule_ids: &[&str]) -> bool {
        self.base_findings.iter().any(|f| rule_ids.contains(&f.rule_id.as_str()))
    }

    pub fn has_literal_containing(&self, needle: &str) -> bool {
        self.method.instructions.iter().any(|instr| {
            instr
                .string_literal()
                .is_some_and(|lit| lit.to_lowercase().contains(&needle.to_lowercase()))
        })
    }

    pub fn has_any_literal_containing(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.has_literal_containing(n))
    }

    pub fn min_offset_of(&self, rule_ids: &[&str]) -> u32 {
        self.base_findings
            .iter()
            .filter(|f| rule_ids.contains(&f.rule_id.as_str()))
            .filter_map(|f| f.location.rsplit(':').next().and_then(|s| s.parse::<u32>().ok()))
            .min()
            .unwrap_or(0)
    }
}

/// A single correlation detector in the deep-behavior bank (§4.9). Mirrors
/// the `Rule` trait's narrow-shape-over-inheritance design: one hook,
/// default-empty, no base class.
pub trait DeepAnalyzer: Send + Sync {
    fn id(&self) -> &'static str;
    fn is_enabled(&self, config: &DeepAnalysisConfig) -> bool;
    fn analyze(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding>;
}

const SEED_RULE_IDS: &[&str] = &[
    "ProcessStartRule",
    "Shell32Rule",
    "AssemblyDynamicLoadRule",
    "ComReflectionAttackRule",
    "PersistenceRule",
    "RegistryRule",
    "DataExfiltrationRule",
    "DataInfiltrationRule",
    "DllImportRule",
];

const ENTRY_POINT_PREFIXES: &[&str] = &["OnInitializeMelon", "OnApplicationStart", "Awake", "Start", "Initialize", "OnEnable"];

fn is_entry_point_like(method_name: &str) -> bool {
    ENTRY_POINT_PREFIXES.iter().any(|p| method_name.starts_with(p)) || method_name.contains("Patch")
}

/// Selects whether a method qualifies for the (expensive) deep-analysis
/// pass, per the four disjunctive criteria in §4.9.
pub fn method_selected_for_deep_analysis(method: &Method, findings: &[ScanFinding], signals: &MethodSignals) -> bool {
    if findings.iter().any(|f| SEED_RULE_IDS.contains(&f.rule_id.as_str())) {
        return true;
    }
    if signals.signal_count() >= 3 {
        return true;
    }
    if (signals.file_write && signals.env_modified) || (signals.sensitive_folder && signals.file_write) {
        return true;
    }
    if is_entry_point_like(&method.name) && !findings.is_empty() {
        return true;
    }
    false
}

/// Runs the fixed analyzer bank, in order, under a per-method wall-clock
/// budget; stops as soon as the budget is exhausted, keeping whatever
/// partial results were already produced.
pub struct DeepBehaviorOrchestrator {
    bank: Vec<Box<dyn DeepAnalyzer>>,
}

impl DeepBehaviorOrchestrator {
    pub fn new(bank: Vec<Box<dyn DeepAnalyzer>>) -> Self {
        Self { bank }
    }

    pub fn with_default_bank() -> Self {
        Self::new(default_bank())
    }

    pub fn run(&self, ctx: &DeepAnalysisContext) -> Vec<ScanFinding> {
        let budget = Duration::from_millis(ctx.config.max_analysis_time_ms_per_method);
        let start = Instant::now();
        let mut findings = Vec::new();

        for analyzer in &self.bank {
            if start.elapsed() >= budget {
                tracing::debug!(method = %ctx.method.key, analyzer = analyzer.id(), "deep analysis budget exhausted");
                break;
            }
            if !analyzer.is_enabled(ctx.config) {
                continue;
            }
            findings.extend(analyzer.analyze(ctx));
        }

        let correlates_with_base_finding = !ctx.base_findings.is_empty();
        let emit = ctx.config.emit_diagnostic_findings
            || (correlates_with_base_finding && ctx.config.require_correlated_base_finding);
        if !emit {
            findings.clear();
        }

        dedup_findings(findings)
    }
}

fn dedup_findings(findings: Vec<ScanFinding>) -> Vec<ScanFinding> {
    let mut seen = std::collections::HashSet::new();
    findings.into_iter().filter(|f| seen.insert(f.dedup_key())).collect()
}

pub fn escalate(base: Severity) -> Severity {
    match base {
        Severity::Low => Severity::Medium,
        Severity::Medium => Severity::High,
        Severity::High => Severity::Critical,
        Severity::Critical => Severity::Critical,
    }
}
