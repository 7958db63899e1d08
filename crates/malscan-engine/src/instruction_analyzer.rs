use std::collections::HashSet;

use malscan_core::{Method, MethodKey, Operand, ScanConfig, ScanFinding};
use malscan_rules::{
    snippet, ContextualContext, LiteralContext, Rule, RuleRegistry, SuppressionContext,
    STRONG_COMPANION_RULE_IDS,
};
use tracing::warn;

use crate::call_graph::CallGraphBuilder;
use crate::capability::{mark_sensitive_folder, update_from_call};
use crate::signal_tracker::SignalTracker;

const REFLECTION_RULE_ID: &str = "ReflectionRule";
const CONTEXT_WINDOW: usize = 2;
const REGISTERED_CALL_SITE_WINDOW: usize = 8;

/// A reflection-invoke finding whose companion gate hadn't been satisfied
/// yet at the point it was observed; revisited after the whole assembly
/// has been walked (§4.3 step 4).
#[derive(Clone)]
pub struct PendingReflection {
    pub method_key: MethodKey,
    pub declaring_type: String,
    pub offset: u32,
    pub snippet: String,
    pub description: String,
    pub severity: malscan_core::Severity,
}

pub struct InstructionAnalyzer<'a> {
    registry: &'a RuleRegistry,
    config: &'a ScanConfig,
}

impl<'a> InstructionAnalyzer<'a> {
    pub fn new(registry: &'a RuleRegistry, config: &'a ScanConfig) -> Self {
        Self { registry, config }
    }

    /// Runs the full per-method pass described in §4.3, steps 1-6.
    pub fn analyze_method(
        &self,
        method: &Method,
        tracker: &mut SignalTracker,
        call_graph: &mut CallGraphBuilder,
        pending: &mut Vec<PendingReflection>,
    ) -> Vec<ScanFinding> {
        let mut findings = Vec::new();
        let handler_offsets: HashSet<u32> =
            if self.config.analyze_exception_handlers { method.handler_offsets() } else { HashSet::new() };

        for (index, instr) in method.instructions.iter().enumerate() {
            if let Operand::String(literal) = &instr.operand {
                findings.extend(self.dispatch_literal(literal, method, instr.offset, tracker));
                continue;
            }

            if !instr.is_call() {
                continue;
            }
            let Some(callee) = instr.method_ref() else { continue };

            // step 1: update signals from the callee's signature.
            {
                let signals = tracker.method_signals_mut(&method.key);
                update_from_call(signals, callee);
                mark_sensitive_folder(signals, &method.instructions, index, callee);
            }

            // step 2: call-graph-registered declaration, consolidated later.
            let callee_key = callee.key();
            if call_graph.is_suspicious_method(&callee_key) {
                let site_snippet = snippet(&method.instructions, index, REGISTERED_CALL_SITE_WINDOW);
                if let Some(info) = call_graph.declaration_info(&callee_key) {
                    let rule_id = info.rule_id.clone();
                    call_graph.register_call_site(
                        &callee_key,
                        crate::call_graph::CallSite {
                            caller: method.key.clone(),
                            offset: instr.offset,
                            snippet: Some(site_snippet),
                        },
                    );
                    tracker.method_signals_mut(&method.key).mark_triggered(&rule_id);
                }
                continue;
            }

            let inside_handler = handler_offsets.contains(&instr.offset);
            if inside_handler {
                continue;
            }

            let type_signals = tracker.type_signals(&method.declaring_type);

            // step 3: contextual analyzers for every rule.
            for rule in self.registry.rules() {
                let method_signals_snapshot = tracker.method_signals(&method.key);
                let ctx = ContextualContext {
                    callee,
                    instructions: &method.instructions,
                    index,
                    method_signals: &method_signals_snapshot,
                    method_key: method.key.as_str(),
                    declaring_type: &method.declaring_type,
                };

                let pattern_findings = match rule.analyze_contextual_pattern(&ctx) {
                    Ok(f) => f,
                    Err(err) => {
                        warn!(
                            rule_id = rule.id(),
                            method_key = method.key.as_str(),
                            offset = instr.offset,
                            %err,
                            "rule failed evaluating a contextual pattern, skipping"
                        );
                        continue;
                    }
                };

                for finding in pattern_findings {
                    let admitted = finding.severity <= malscan_core::Severity::Low
                        || finding.bypass_companion
                        || !rule.requires_companion()
                        || method_signals_snapshot.has_triggered_rule_other_than(rule.id())
                        || type_signals.has_triggered_rule_other_than(rule.id());

                    if !admitted {
                        continue;
                    }

                    if finding.severity > malscan_core::Severity::Low || !rule.requires_companion() {
                        tracker.method_signals_mut(&method.key).mark_triggered(rule.id());
                    }
                    findings.push(finding);
                }
            }

            // step 4: reflection invocation is deferred / companion-gated against a fixed allow-list.
            if let Some(reflection_rule) = self.registry.by_id(REFLECTION_RULE_ID) {
                let is_reflection_call = match reflection_rule.is_suspicious(callee) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(
                            rule_id = REFLECTION_RULE_ID,
                            method_key = method.key.as_str(),
                            offset = instr.offset,
                            %err,
                            "rule failed evaluating a reflective call, skipping"
                        );
                        false
                    }
                };

                if is_reflection_call {
                    let method_signals_snapshot = tracker.method_signals(&method.key);
                    let strong_companion = method_signals_snapshot.has_any_triggered(STRONG_COMPANION_RULE_IDS)
                        || type_signals.has_any_triggered(STRONG_COMPANION_RULE_IDS);

                    if strong_companion {
                        tracker.method_signals_mut(&method.key).mark_triggered(REFLECTION_RULE_ID);
                        findings.push(malscan_rules::rule::finding(
                            reflection_rule,
                            format!("{}:{}", method.key, instr.offset),
                            reflection_rule.description(),
                            Some(snippet(&method.instructions, index, CONTEXT_WINDOW)),
                        ));
                    } else {
                        pending.push(PendingReflection {
                            method_key: method.key.clone(),
                            declaring_type: method.declaring_type.clone(),
                            offset: instr.offset,
                            snippet: snippet(&method.instructions, index, CONTEXT_WINDOW),
                            description: reflection_rule.description(),
                            severity: reflection_rule.severity(),
                        });
                    }
                    continue;
                }
            }

            // step 5: first matching declaration-time predicate, subject to suppression.
            for rule in self.registry.rules() {
                if rule.id() == REFLECTION_RULE_ID {
                    continue;
                }

                let suspicious = match rule.is_suspicious(callee) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(
                            rule_id = rule.id(),
                            method_key = method.key.as_str(),
                            offset = instr.offset,
                            %err,
                            "rule failed evaluating a call, skipping"
                        );
                        continue;
                    }
                };
                if !suspicious {
                    continue;
                }

                let method_signals_snapshot = tracker.method_signals(&method.key);
                let suppression_ctx = SuppressionContext {
                    callee,
                    instructions: &method.instructions,
                    index,
                    method_signals: &method_signals_snapshot,
                    type_signals: &type_signals,
                };
                let suppressed = match rule.should_suppress_finding(&suppression_ctx) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(
                            rule_id = rule.id(),
                            method_key = method.key.as_str(),
                            offset = instr.offset,
                            %err,
                            "rule failed evaluating suppression, finding not suppressed"
                        );
                        false
                    }
                };
                if suppressed {
                    break;
                }

                tracker.method_signals_mut(&method.key).mark_triggered(rule.id());
                findings.push(malscan_rules::rule::finding(
                    rule.as_ref(),
                    format!("{}:{}", method.key, instr.offset),
                    rule.description(),
                    Some(snippet(&method.instructions, index, CONTEXT_WINDOW)),
                ));
                break;
            }
        }

        findings
    }

    fn dispatch_literal(
        &self,
        literal: &str,
        method: &Method,
        offset: u32,
        tracker: &mut SignalTracker,
    ) -> Vec<ScanFinding> {
        let mut findings = Vec::new();
        let type_signals = tracker.type_signals(&method.declaring_type);

        for rule in self.registry.rules() {
            let method_signals_snapshot = tracker.method_signals(&method.key);
            let ctx = LiteralContext {
                literal,
                method_key: method.key.as_str(),
                offset,
                minimum_encoded_string_length: self.config.minimum_encoded_string_length,
            };
            let literal_findings = match rule.analyze_string_literal(&ctx) {
                Ok(f) => f,
                Err(err) => {
                    warn!(rule_id = rule.id(), method_key = method.key.as_str(), offset, %err, "rule failed evaluating a string literal, skipping");
                    continue;
                }
            };

            for finding in literal_findings {
                let admitted = finding.severity <= malscan_core::Severity::Low
                    || finding.bypass_companion
                    || !rule.requires_companion()
                    || method_signals_snapshot.has_triggered_rule_other_than(rule.id())
                    || type_signals.has_triggered_rule_other_than(rule.id());

                if !admitted {
                    continue;
                }
                tracker.method_signals_mut(&method.key).mark_triggered(rule.id());
                findings.push(finding);
            }
        }

        findings
    }
}

/// Re-checks deferred reflection findings against final type signals after
/// the whole assembly has been walked (§4.3 step 4, §5 ordering guarantee).
pub fn flush_pending_reflections(pending: Vec<PendingReflection>, tracker: &SignalTracker) -> Vec<ScanFinding> {
    pending
        .into_iter()
        .filter(|p| {
            let method_signals = tracker.method_signals(&p.method_key);
            let type_signals = tracker.type_signals(&p.declaring_type);
            method_signals.has_any_triggered(STRONG_COMPANION_RULE_IDS)
                || type_signals.has_any_triggered(STRONG_COMPANION_RULE_IDS)
        })
        .map(|p| ScanFinding {
            rule_id: REFLECTION_RULE_ID.to_string(),
            location: format!("{}:{}", p.method_key, p.offset),
            description: p.description,
            severity: p.severity,
            snippet: Some(p.snippet),
            call_chain: None,
            data_flow_chain: None,
            bypass_companion: false,
            risk_score: None,
            developer_guidance: None,
        })
        .collect()
}
