use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use malscan_api::dto::{self, ScanResult};
use malscan_core::{AssemblyRole, ScanConfig};
use malscan_crossasm::{canonical_path, PropagationPolicy};

#[derive(Parser)]
#[command(name = "malscan")]
#[command(about = "Static malware analysis for compiled .NET/Unity-mod assemblies", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Path to a TOML config file (layered over the built-in defaults)
    #[arg(long, global = true, env = "MALSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Widen logging to debug level, mirroring the config's developer-mode flag
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, ValueEnum)]
enum RoleArg {
    Mod,
    Plugin,
    UserLib,
    Patcher,
}

impl From<RoleArg> for AssemblyRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Mod => AssemblyRole::Mod,
            RoleArg::Plugin => AssemblyRole::Plugin,
            RoleArg::UserLib => AssemblyRole::UserLib,
            RoleArg::Patcher => AssemblyRole::Patcher,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum PolicyArg {
    CallerOnly,
    CallerAndCallee,
    DependencyCluster,
}

impl From<PolicyArg> for PropagationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::CallerOnly => PropagationPolicy::CallerOnly,
            PolicyArg::CallerAndCallee => PropagationPolicy::CallerAndCallee,
            PolicyArg::DependencyCluster => PropagationPolicy::DependencyCluster,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a single assembly on disk
    Scan {
        /// Path to the assembly file
        path: PathBuf,
    },

    /// Scan every assembly matched by one or more glob patterns
    ScanBatch {
        /// Glob pattern to resolve into concrete file paths (repeatable)
        #[arg(short, long = "glob", required = true)]
        globs: Vec<String>,

        /// Role assigned to every assembly resolved from the glob patterns
        #[arg(short, long, value_enum, default_value = "mod")]
        role: RoleArg,

        /// Cross-assembly risk propagation policy
        #[arg(short, long, value_enum, default_value = "caller-and-callee")]
        policy: PolicyArg,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = ScanConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if cli.verbose {
        config.developer_mode = true;
    }

    let results = match &cli.command {
        Commands::Scan { path } => vec![scan_one(path, config)?],
        Commands::ScanBatch { globs, role, policy } => {
            scan_many(globs, role.clone().into(), policy.clone().into(), config)?
        }
    };

    for result in &results {
        print_result(&cli.format, result)?;
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn scan_one(path: &PathBuf, config: ScanConfig) -> Result<ScanResult> {
    let scanned = malscan_api::scan(path, config).with_context(|| format!("scan failed for {}", path.display()))?;

    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| path.display().to_string());
    Ok(dto::from_findings(&file_name, scanned.size_bytes, scanned.sha256, "standard", chrono::Utc::now(), &scanned.findings))
}

fn scan_many(
    globs: &[String],
    role: AssemblyRole,
    policy: PropagationPolicy,
    config: ScanConfig,
) -> Result<Vec<ScanResult>> {
    let paths = resolve_globs(globs)?;
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let targets: Vec<malscan_api::ScanTarget<'_>> =
        paths.iter().map(|path| malscan_api::ScanTarget { path, role }).collect();

    let mut findings_by_path = malscan_api::scan_batch(&targets, &config, policy)?;

    let mut results = Vec::with_capacity(paths.len());
    for path in &paths {
        let key = canonical_path(path);
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| key.clone());
        let Some(scanned) = findings_by_path.remove(&key) else { continue };
        results.push(dto::from_findings(&file_name, scanned.size_bytes, scanned.sha256, "batch", chrono::Utc::now(), &scanned.findings));
    }
    Ok(results)
}

/// Resolves CLI-provided glob patterns to concrete paths before any engine
/// code runs; the engine only ever receives an already-resolved path list.
fn resolve_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(globset::Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?);
    }
    let set = builder.build().context("failed to build glob set")?;

    let root = std::env::current_dir().context("failed to read current directory")?;
    let mut matches = Vec::new();
    for entry in walk(&root) {
        if set.is_match(&entry) {
            matches.push(entry);
        }
    }
    matches.sort();
    Ok(matches)
}

fn walk(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else { return out };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path));
        } else {
            out.push(path);
        }
    }
    out
}

fn print_result(format: &OutputFormat, result: &ScanResult) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", dto::to_json(result)?);
        }
        OutputFormat::Pretty => print_pretty(result),
    }
    Ok(())
}

fn print_pretty(result: &ScanResult) {
    println!("{} {}", "Scanned:".cyan().bold(), result.input.file_name);
    println!("  {} {}", "sha256:".cyan(), result.input.sha256_hash);
    println!("  {} {}", "findings:".cyan(), result.summary.total_findings.to_string().yellow());

    if result.summary.total_findings == 0 {
        println!("  {}", "clean".green());
        return;
    }

    for (severity, count) in &result.summary.count_by_severity {
        println!("  {}: {}", severity, count);
    }

    for finding in &result.findings {
        let severity_colored = match finding.severity {
            malscan_core::Severity::Critical => finding.severity.to_string().red().bold(),
            malscan_core::Severity::High => finding.severity.to_string().red(),
            malscan_core::Severity::Medium => finding.severity.to_string().yellow(),
            malscan_core::Severity::Low => finding.severity.to_string().normal(),
        };
        println!("\n  [{}] {} at {}", severity_colored, finding.rule_id.bold(), finding.location);
        println!("      {}", finding.description);
    }
}
