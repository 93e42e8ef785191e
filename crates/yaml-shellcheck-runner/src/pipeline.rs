//! Per-run orchestration: parse, classify, extract, materialize, analyze.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use yaml_shellcheck_core::{
    extract_documents, load_documents, Dialect, MaterializedScript, ScriptDir, WorkDir,
    DEFAULT_SHEBANG,
};

use crate::analyzer::{Analyzer, AnalyzerVerdict, MAX_PATHS_PER_INVOCATION};
use crate::error::RunError;
use crate::severity::Severity;

/// Settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Output directory; a temporary one when `None`.
    pub outdir: Option<PathBuf>,

    /// Keep written scripts after the run.
    pub keep: bool,

    /// Default shebang line for scripts.
    pub shebang: String,

    /// Input files processed concurrently.
    pub jobs: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outdir: None,
            keep: false,
            shebang: DEFAULT_SHEBANG.to_string(),
            jobs: 1,
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileStatus {
    /// No document matched a known dialect.
    Unrecognized,
    /// Recognized, but without any shell scripts.
    NoScripts,
    Analyzed,
    ParseFailed { error: String },
    ExtractFailed { error: String },
}

impl FileStatus {
    pub fn severity(&self) -> Severity {
        match self {
            FileStatus::ParseFailed { .. } | FileStatus::ExtractFailed { .. } => {
                Severity::FileError
            }
            _ => Severity::Clean,
        }
    }
}

/// Result for one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub dialects: Vec<Dialect>,
    /// Number of extracted fragments.
    pub fragments: usize,
    pub scripts: Vec<MaterializedScript>,
    pub status: FileStatus,
    pub verdicts: Vec<AnalyzerVerdict>,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            dialects: Vec::new(),
            fragments: 0,
            scripts: Vec::new(),
            status: FileStatus::NoScripts,
            verdicts: Vec::new(),
        }
    }

    /// Worst of the file status and all analyzer verdicts.
    pub fn severity(&self) -> Severity {
        Severity::aggregate(
            std::iter::once(self.status.severity())
                .chain(self.verdicts.iter().map(|v| v.severity)),
        )
    }
}

/// Result of a whole run, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub outcome: Severity,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Analyzer output of every invocation, in input order.
    pub fn analyzer_output(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .flat_map(|f| f.verdicts.iter())
            .map(|v| v.output.as_str())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Process `files` and aggregate the analyzer verdicts.
///
/// Per-file parse and extraction failures are recorded in the report. A
/// materialization or analyzer invocation failure aborts the run; the
/// working directory is cleaned up either way.
pub async fn run(
    files: &[PathBuf],
    config: &RunConfig,
    analyzer: &dyn Analyzer,
) -> Result<RunReport, RunError> {
    let mut workdir = WorkDir::create(config.outdir.as_deref(), config.keep)?;
    info!(dir = %workdir.path().display(), keep = config.keep, "working directory");

    let dirs: Vec<ScriptDir> = files.iter().map(|f| workdir.reserve(f)).collect();
    let reports: Vec<FileReport> = stream::iter(files.iter().zip(dirs))
        .map(|(path, dir)| process_file(path, dir, config, analyzer))
        .buffered(config.jobs.max(1))
        .try_collect()
        .await?;

    let outcome = Severity::aggregate(reports.iter().map(FileReport::severity));
    info!(files = reports.len(), outcome = %outcome, "run finished");
    Ok(RunReport {
        files: reports,
        outcome,
    })
}

async fn process_file(
    path: &Path,
    mut dir: ScriptDir,
    config: &RunConfig,
    analyzer: &dyn Analyzer,
) -> Result<FileReport, RunError> {
    let mut report = FileReport::new(path);

    let documents = match load_documents(path) {
        Ok(documents) => documents,
        Err(e) => {
            error!(file = %path.display(), error = %e, "failed to parse");
            report.status = FileStatus::ParseFailed {
                error: e.to_string(),
            };
            return Ok(report);
        }
    };

    let extraction = match extract_documents(&documents, path) {
        Ok(extraction) => extraction,
        Err(e) => {
            error!(file = %path.display(), error = %e, "failed to extract scripts");
            report.status = FileStatus::ExtractFailed {
                error: e.to_string(),
            };
            return Ok(report);
        }
    };
    report.dialects = extraction.dialects.clone();
    report.fragments = extraction.fragments.len();

    if extraction.is_unrecognized() {
        warn!(file = %path.display(), "unknown YAML dialect, skipping");
        report.status = FileStatus::Unrecognized;
        return Ok(report);
    }
    if extraction.fragments.is_empty() {
        info!(file = %path.display(), "no shell scripts found");
        report.status = FileStatus::NoScripts;
        return Ok(report);
    }

    report.scripts = dir.materialize_all(&extraction.fragments, &config.shebang)?;
    let relative: Vec<PathBuf> = report.scripts.iter().map(|s| s.relative.clone()).collect();
    for chunk in relative.chunks(MAX_PATHS_PER_INVOCATION) {
        let verdict = analyzer.analyze(dir.root(), chunk).await?;
        debug!(
            file = %path.display(),
            severity = %verdict.severity,
            codes = ?verdict.codes,
            "analyzer verdict"
        );
        report.verdicts.push(verdict);
    }
    report.status = FileStatus::Analyzed;
    Ok(report)
}
