mod support;

use malscan_core::{ScanConfig, Severity};
use malscan_engine::AssemblyScanner;
use malscan_rules::RuleRegistry;
use support::*;

fn scanner() -> AssemblyScanner {
    AssemblyScanner::new(RuleRegistry::with_defaults(), ScanConfig::default())
}

/// S1: a method with no suspicious calls at all produces zero findings.
#[test]
fn clean_method_yields_no_findings() {
    let m = method(
        "Game.Player",
        "Update",
        vec![call(0, "UnityEngine.Debug", "Log", 1), nop(1)],
    );
    let assembly = single_type_assembly("Game.Player", vec![m]);

    let findings = scanner().scan(&assembly);

    assert!(findings.is_empty(), "expected no findings, got {findings:?}");
}

/// S2: `Process.Start("explorer.exe")` with no env/file-write signal and no
/// path manipulation is the explicitly whitelisted "restart explorer" shape.
#[test]
fn bare_explorer_restart_is_suppressed() {
    let m = method(
        "Game.Launcher",
        "Relaunch",
        vec![ldstr(0, "explorer.exe"), call(1, "System.Diagnostics.Process", "Start", 1)],
    );
    let assembly = single_type_assembly("Game.Launcher", vec![m]);

    let findings = scanner().scan(&assembly);

    assert!(
        findings.iter().all(|f| f.rule_id != "ProcessStartRule"),
        "ProcessStartRule should have been suppressed, got {findings:?}"
    );
}

/// S3a: once the same method has tampered with PATH, the explorer-restart
/// whitelist no longer applies and both findings surface.
#[test]
fn env_path_tamper_defeats_explorer_suppression() {
    let m = method(
        "Game.Launcher",
        "Relaunch",
        vec![
            ldstr(0, "C:\\malicious"),
            ldstr(1, "PATH"),
            call(2, "System.Environment", "SetEnvironmentVariable", 2),
            ldstr(3, "explorer.exe"),
            call(4, "System.Diagnostics.Process", "Start", 1),
        ],
    );
    let assembly = single_type_assembly("Game.Launcher", vec![m]);

    let findings = scanner().scan(&assembly);

    let path_finding = findings.iter().find(|f| f.rule_id == "EnvironmentPathRule");
    let process_finding = findings.iter().find(|f| f.rule_id == "ProcessStartRule");

    assert!(path_finding.is_some(), "expected EnvironmentPathRule finding, got {findings:?}");
    assert_eq!(process_finding.map(|f| f.severity), Some(Severity::Critical));
}

/// S3b: a `String.Concat` call interposed between the "explorer.exe" literal
/// and `Process.Start` defeats the bare-explorer whitelist on its own, with
/// no env/file-write signal required.
#[test]
fn string_concat_path_manipulation_defeats_explorer_suppression() {
    let m = method(
        "Game.Launcher",
        "Relaunch",
        vec![
            ldstr(0, "C:\\x"),
            ldstr(1, "explorer.exe"),
            call(2, "System.String", "Concat", 2),
            call(3, "System.Diagnostics.Process", "Start", 1),
        ],
    );
    let assembly = single_type_assembly("Game.Launcher", vec![m]);

    let findings = scanner().scan(&assembly);

    let process_finding = findings
        .iter()
        .find(|f| f.rule_id == "ProcessStartRule")
        .expect("expected a ProcessStartRule finding, got none");
    assert_eq!(process_finding.severity, Severity::Critical);
}

/// S4: a P/Invoke declaration into shell32.dll, called from one site, gets
/// consolidated into a single `CallChain` finding rather than two standalone ones.
#[test]
fn pinvoke_declaration_and_call_site_consolidate() {
    let decl = pinvoke_method("Game.Native.NativeMethods", "ShellExecute", "shell32.dll", "ShellExecuteW");
    let caller = method(
        "Game.Native.Launcher",
        "Run",
        vec![call(0, "Game.Native.NativeMethods", "ShellExecute", 0)],
    );
    let assembly = single_type_assembly("Game.Native", vec![decl, caller]);

    let findings = scanner().scan(&assembly);

    let shell_findings: Vec<_> = findings.iter().filter(|f| f.rule_id == "Shell32Rule").collect();
    assert_eq!(shell_findings.len(), 1, "expected one consolidated finding, got {findings:?}");
    let chain = shell_findings[0].call_chain.as_ref().expect("expected a call chain");
    assert_eq!(chain.nodes.len(), 2);
}

/// A method declaring two or more watchlisted local types (here a byte
/// buffer and a `ProcessStartInfo`) trips the structural locals check.
#[test]
fn staged_payload_locals_trigger_suspicious_local_variable_rule() {
    let m = with_locals(
        method("Game.Loader", "Stage", vec![nop(0)]),
        &["System.Byte[]", "System.Diagnostics.ProcessStartInfo"],
    );
    let assembly = single_type_assembly("Game.Loader", vec![m]);

    let findings = scanner().scan(&assembly);

    let finding = findings
        .iter()
        .find(|f| f.rule_id == "SuspiciousLocalVariableRule")
        .expect("expected a SuspiciousLocalVariableRule finding");
    assert_eq!(finding.severity, Severity::Low);
}

/// S5: download -> write -> execute is the `DownloadAndExecute` data-flow pattern.
#[test]
fn download_write_execute_matches_data_flow_pattern() {
    let m = method(
        "Game.Updater",
        "Apply",
        vec![
            call(0, "System.Net.WebClient", "DownloadData", 1),
            call(1, "System.IO.File", "WriteAllBytes", 2),
            call(2, "System.Diagnostics.Process", "Start", 1),
        ],
    );
    let assembly = single_type_assembly("Game.Updater", vec![m]);

    let findings = scanner().scan(&assembly);

    let data_flow = findings
        .iter()
        .find(|f| f.rule_id == "DataFlowAnalysis")
        .expect("expected a data-flow finding");
    let chain = data_flow.data_flow_chain.as_ref().unwrap();
    assert_eq!(chain.pattern, malscan_core::DataFlowPattern::DownloadAndExecute);
    assert_eq!(chain.severity, Severity::Critical);
}
