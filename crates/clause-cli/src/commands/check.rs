//! Check command - analyzes translation-unit dumps for rule violations

use crate::output::json::JsonFormatter;
use crate::output::text::TextFormatter;
use anyhow::Result;
use clap::Args;
use clause_core::analysis::{AnalysisEngine, RunSummary};
use clause_core::config::{Config, load_config_or_default_with_warnings};
use clause_core::diagnostic::{Diagnostic, ResultsCollection, Severity};
use clause_core::syntax::SyntaxTree;
use colored::Colorize;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process;
use walkdir::WalkDir;

const DUMP_SUFFIX: &str = ".tu.json";

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a dump file or a directory of *.tu.json dumps
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format for diagnostics (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Fail on warnings (exit code 1)
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Filter diagnostics by minimum severity level (error, warning, info)
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// What one `check` run found, before anything is printed.
#[derive(Debug)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub total_files: usize,
    /// Dumps that could not be read or converted, with the reason.
    pub failed_files: Vec<(PathBuf, String)>,
    pub summary: RunSummary,
}

impl CheckReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn should_fail(&self, fail_on_warnings: bool) -> bool {
        !self.failed_files.is_empty()
            || self.count(Severity::Error) > 0
            || (fail_on_warnings && self.count(Severity::Warning) > 0)
    }
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();

        let config_dir = config_dir(&self.path);
        let config_result = load_config_or_default_with_warnings(&config_dir);
        for warning in &config_result.warnings {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }

        let engine = AnalysisEngine::with_config(&config_result.config)?;
        let report = self.execute(&engine)?;

        for (path, reason) in &report.failed_files {
            eprintln!(
                "{} failed to load {}: {}",
                "error:".red().bold(),
                path.display(),
                reason
            );
        }

        if report.total_files == 0 {
            println!("No translation-unit dumps (*{}) found.", DUMP_SUFFIX);
            return Ok(());
        }

        match self.format.as_str() {
            "json" => {
                let formatter = JsonFormatter::with_registry(engine.registry());
                println!(
                    "{}",
                    formatter.format(
                        &report.diagnostics,
                        report.total_files,
                        &self.path.to_string_lossy()
                    )
                );
            }
            _ => print!("{}", TextFormatter::new().format(&report.diagnostics)),
        }

        if report.should_fail(self.fail_on_warnings) {
            process::exit(1);
        }

        Ok(())
    }

    /// Discovers and analyzes every dump under `self.path`.
    pub fn execute(&self, engine: &AnalysisEngine) -> Result<CheckReport> {
        let min_severity = self.parse_severity()?;
        let files = discover_files(&self.path, engine.config())?;
        tracing::debug!(files = files.len(), path = %self.path.display(), "discovered dumps");

        let results = ResultsCollection::new();
        let outcomes: Vec<(PathBuf, std::result::Result<RunSummary, String>)> = files
            .par_iter()
            .map(|file| {
                let outcome = SyntaxTree::from_path(file)
                    .map(|tree| engine.analyze(&tree, &results))
                    .map_err(|e| e.to_string());
                (file.clone(), outcome)
            })
            .collect();

        let mut summary = RunSummary::default();
        let mut failed_files = Vec::new();
        for (file, outcome) in outcomes {
            match outcome {
                Ok(run) => absorb(&mut summary, run),
                Err(reason) => failed_files.push((file, reason)),
            }
        }

        let mut diagnostics: Vec<Diagnostic> = results
            .into_inner()
            .into_iter()
            .filter(|d| severity_level(&d.severity) >= severity_level(&min_severity))
            .collect();
        diagnostics.sort_by(|a, b| {
            (&a.file, a.line, a.column, &a.rule_id).cmp(&(&b.file, b.line, b.column, &b.rule_id))
        });

        tracing::info!(
            files = files.len(),
            diagnostics = diagnostics.len(),
            suppressed = summary.suppressed,
            rule_failures = summary.rule_failures + summary.exploration.checker_failures,
            "check finished"
        );

        Ok(CheckReport {
            diagnostics,
            total_files: files.len(),
            failed_files,
            summary,
        })
    }

    fn parse_severity(&self) -> Result<Severity> {
        match self.severity.as_deref() {
            Some("error") => Ok(Severity::Error),
            Some("warning") => Ok(Severity::Warning),
            Some("info") | None => Ok(Severity::Info),
            Some(other) => anyhow::bail!(
                "Invalid severity '{}'. Valid values: error, warning, info",
                other
            ),
        }
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }
}

fn absorb(total: &mut RunSummary, run: RunSummary) {
    total.structural_rules = total.structural_rules.max(run.structural_rules);
    total.symbolic_rules = total.symbolic_rules.max(run.symbolic_rules);
    total.matches += run.matches;
    total.reported += run.reported;
    total.suppressed += run.suppressed;
    total.rule_failures += run.rule_failures;
    total.exploration.absorb(run.exploration);
}

fn config_dir(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        path.to_path_buf()
    }
}

fn discover_files(path: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        return Ok(if is_dump_file(path) {
            vec![path.to_path_buf()]
        } else {
            vec![]
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_excluded(e, path, config))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_dump_file(e.path()))
        .filter(|e| is_included(e.path(), path, config))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    Ok(files)
}

fn is_dump_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(DUMP_SUFFIX) && name.len() > DUMP_SUFFIX.len())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_excluded(entry: &walkdir::DirEntry, root: &Path, config: &Config) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    config.exclude.iter().any(|pattern| {
        relative.starts_with(pattern) || entry.file_name().to_str() == Some(pattern.as_str())
    })
}

fn is_included(file: &Path, root: &Path, config: &Config) -> bool {
    if config.include.is_empty() {
        return true;
    }
    let relative = file.strip_prefix(root).unwrap_or(file);
    config.include.iter().any(|prefix| relative.starts_with(prefix))
}

fn severity_level(severity: &Severity) -> u8 {
    match severity {
        Severity::Error => 3,
        Severity::Warning => 2,
        Severity::Info => 1,
    }
}
