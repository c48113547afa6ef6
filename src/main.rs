//! Binary entry point for the docphrase CLI.
//!
//! All output is JSON on stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Check every snapshot under a directory
//! docphrase check snapshots/
//!
//! # Fix one snapshot and write the updated copy
//! docphrase fix snapshot.json --write fixed.json
//!
//! # List the rules in effect
//! docphrase --disable 'DP001*' rules
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use walkdir::WalkDir;

use docphrase::catalog::load_catalog;
use docphrase::config::{CliOverrides, EnvOverrides, ProjectConfig, ResolvedConfig};
use docphrase::error::{DocError, OutputErrorCode};
use docphrase::output::{emit_response, CheckResponse, ErrorResponse, FixResponse, RulesResponse};
use docphrase::scan::{CancellationToken, Scanner};
use docphrase::snapshot::{finding_infos, fix_file, load_files, LoadedFile, Snapshot};

// ============================================================================
// CLI Structure
// ============================================================================

/// Phrasing lints for documentation comments.
#[derive(Parser, Debug)]
#[command(name = "docphrase", version, about = "Phrasing lints for documentation comments")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Project configuration file (default: `.docphrase.json` in the current directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra rules as a JSON array, appended to the built-in catalog.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Disable rules whose id matches the glob (repeatable).
    #[arg(long, global = true)]
    disable: Vec<String>,

    /// Maximum words per sentence.
    #[arg(long, global = true)]
    max_sentence_words: Option<usize>,

    /// Maximum fix passes per entity.
    #[arg(long, global = true)]
    max_fix_passes: Option<usize>,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Check snapshots and report findings (exit 1 when any are found).
    Check {
        /// Snapshot file, or a directory searched for `*.json` snapshots.
        path: PathBuf,
    },
    /// Fix a snapshot until stable and report the edits.
    Fix {
        /// Snapshot file.
        path: PathBuf,
        /// Write the updated snapshot here.
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// List the rules in effect.
    Rules,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<ExitCode, DocError> {
    match cli.command {
        Command::Check { path } => execute_check(&cli.global, &path),
        Command::Fix { path, write } => execute_fix(&cli.global, &path, write.as_deref()),
        Command::Rules => execute_rules(&cli.global),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

/// Execute check command.
fn execute_check(global: &GlobalArgs, path: &Path) -> Result<ExitCode, DocError> {
    let scanner = build_scanner(global)?;
    let files = load_files(read_snapshots(path)?)?;
    let items: Vec<_> = files.iter().flat_map(LoadedFile::scan_items).collect();
    info!(files = files.len(), entities = items.len(), "checking");

    let report = scanner.scan(&items, &CancellationToken::new());
    let findings = finding_infos(&files, &report.findings);
    let has_findings = !findings.is_empty();
    let response = CheckResponse::new(files.len(), report.entities_checked, findings, report.skipped);
    emit(&response)?;

    Ok(if has_findings {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// Execute fix command.
///
/// Every entity is fixed until no fixable finding is left; the response
/// carries the applied edits, per-file unified diffs and what remains.
fn execute_fix(global: &GlobalArgs, path: &Path, write: Option<&Path>) -> Result<ExitCode, DocError> {
    let scanner = build_scanner(global)?;
    if !path.is_file() {
        return Err(DocError::invalid_args(format!(
            "fix expects a snapshot file, got {}",
            path.display()
        )));
    }
    let files = load_files(vec![Snapshot::load(path)?])?;
    let cancel = CancellationToken::new();

    let mut fixed = Snapshot::default();
    let mut edits = Vec::new();
    let mut fixed_files = Vec::new();
    let mut remaining = Vec::new();
    let mut entities_fixed = 0;
    for loaded in &files {
        let fix = fix_file(&scanner, loaded, &cancel);
        entities_fixed += fix.entities_fixed;
        edits.extend(fix.edits);
        remaining.extend(fix.remaining);
        fixed_files.extend(fix.fixed);
        fixed.files.push(fix.file);
    }

    if let Some(out) = write {
        let json = fixed.to_json()?;
        std::fs::write(out, json).map_err(|e| DocError::internal(format!("failed to write {}: {}", out.display(), e)))?;
        debug!(path = %out.display(), "wrote fixed snapshot");
    }

    let response = FixResponse::new(files.len(), entities_fixed, edits, fixed_files, remaining);
    emit(&response)?;
    Ok(ExitCode::SUCCESS)
}

/// Execute rules command.
fn execute_rules(global: &GlobalArgs) -> Result<ExitCode, DocError> {
    let scanner = build_scanner(global)?;
    emit(&RulesResponse::new(scanner.rules()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helpers
// ============================================================================

fn build_scanner(global: &GlobalArgs) -> Result<Scanner, DocError> {
    let project = match &global.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|_| DocError::file_not_found(path.display().to_string()))?;
            Some(ProjectConfig::parse(&json, path)?)
        }
        None => ProjectConfig::load(Path::new("."))?,
    };
    let cli = CliOverrides {
        disable: global.disable.clone(),
        max_sentence_words: global.max_sentence_words,
        max_fix_passes: global.max_fix_passes,
    };
    let config = ResolvedConfig::resolve(project.as_ref(), &EnvOverrides::from_env()?, &cli)?;

    let extra = match &global.rules {
        Some(path) => Some(
            std::fs::read_to_string(path).map_err(|_| DocError::file_not_found(path.display().to_string()))?,
        ),
        None => None,
    };
    let rules = load_catalog(extra.as_deref())?;
    Ok(Scanner::new(rules, &config))
}

/// Snapshots at `path`: the file itself, or every `*.json` under the directory
/// in path order.
fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>, DocError> {
    if !path.exists() {
        return Err(DocError::file_not_found(path.display().to_string()));
    }
    if path.is_file() {
        return Ok(vec![Snapshot::load(path)?]);
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    debug!(count = paths.len(), dir = %path.display(), "found snapshots");
    paths
        .iter()
        .map(|p| Snapshot::load(p).map_err(DocError::from))
        .collect()
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), DocError> {
    emit_response(response, &mut io::stdout()).map_err(|e| DocError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
