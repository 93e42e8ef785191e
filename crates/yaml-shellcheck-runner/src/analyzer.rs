//! External analyzer invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AnalyzerError;
use crate::severity::Severity;

/// Upper bound on script paths passed to one analyzer process.
pub const MAX_PATHS_PER_INVOCATION: usize = 512;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bSC\d+\b").expect("valid regex"));

/// Result of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerVerdict {
    pub severity: Severity,

    /// Raw exit code; `None` if killed by a signal or timed out.
    pub exit_code: Option<i32>,

    /// Combined stdout and stderr.
    pub output: String,

    /// Script paths covered, relative to the working directory.
    pub files: Vec<PathBuf>,

    /// `SC<digits>` codes in first-seen order, without duplicates.
    pub codes: Vec<String>,

    pub timed_out: bool,
}

impl AnalyzerVerdict {
    pub fn from_output(exit_code: Option<i32>, output: String, files: Vec<PathBuf>) -> Self {
        let codes = diagnostic_codes(&output);
        Self {
            severity: Severity::from_exit_code(exit_code),
            exit_code,
            output,
            files,
            codes,
            timed_out: false,
        }
    }

    pub fn timed_out(files: Vec<PathBuf>, limit: Duration) -> Self {
        Self {
            severity: Severity::FileError,
            exit_code: None,
            output: format!("analyzer timed out after {}s\n", limit.as_secs_f64()),
            files,
            codes: Vec::new(),
            timed_out: true,
        }
    }
}

/// Collect `SC<digits>` codes, deduplicated in first-seen order.
pub fn diagnostic_codes(output: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for m in CODE_RE.find_iter(output) {
        if !codes.iter().any(|c| c == m.as_str()) {
            codes.push(m.as_str().to_string());
        }
    }
    codes
}

/// Backend that checks materialized scripts.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze `scripts` (relative to `workdir`) in a single invocation.
    async fn analyze(
        &self,
        workdir: &Path,
        scripts: &[PathBuf],
    ) -> Result<AnalyzerVerdict, AnalyzerError>;
}

/// Command line and limits for [`ShellCheck`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Program followed by fixed arguments; script paths are appended.
    pub command: Vec<String>,

    /// Per-invocation limit. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl AnalyzerConfig {
    /// Split a command line on whitespace.
    pub fn from_command_line(command: &str) -> Self {
        Self {
            command: command.split_whitespace().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: vec!["shellcheck".to_string()],
            timeout: None,
        }
    }
}

/// Runs the configured analyzer as a subprocess.
#[derive(Debug, Clone)]
pub struct ShellCheck {
    config: AnalyzerConfig,
}

impl ShellCheck {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        if config.command.is_empty() {
            return Err(AnalyzerError::EmptyCommand);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn program(&self) -> &str {
        &self.config.command[0]
    }
}

#[async_trait]
impl Analyzer for ShellCheck {
    async fn analyze(
        &self,
        workdir: &Path,
        scripts: &[PathBuf],
    ) -> Result<AnalyzerVerdict, AnalyzerError> {
        let program = self.program();
        let args = &self.config.command[1..];
        debug!(
            command = %self.config.command.join(" "),
            cwd = %workdir.display(),
            files = scripts.len(),
            "running analyzer"
        );

        let child = Command::new(program)
            .args(args)
            .args(scripts)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AnalyzerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let waited = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // dropping the wait future drops the child, which kills it
                    warn!(timeout_secs = limit.as_secs_f64(), "analyzer timed out");
                    return Ok(AnalyzerVerdict::timed_out(scripts.to_vec(), limit));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| AnalyzerError::Wait {
            program: program.to_string(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code();
        debug!(exit_code = ?exit_code, "analyzer finished");

        Ok(AnalyzerVerdict::from_output(exit_code, text, scripts.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ShellCheck {
        ShellCheck::new(AnalyzerConfig {
            command: vec!["sh".into(), "-c".into(), script.into(), "analyzer".into()],
            timeout: None,
        })
        .expect("analyzer")
    }

    #[test]
    fn test_diagnostic_codes_dedup_in_order() {
        let output = "SC2154 (warning)\nhttps://www.shellcheck.net/wiki/SC2086\nSC2154 again\nNOTSC1";
        assert_eq!(diagnostic_codes(output), vec!["SC2154", "SC2086"]);
    }

    #[test]
    fn test_command_line_split() {
        let config = AnalyzerConfig::from_command_line("shellcheck  -x --severity=style");
        assert_eq!(config.command, vec!["shellcheck", "-x", "--severity=style"]);
        assert!(ShellCheck::new(AnalyzerConfig::from_command_line("  ")).is_err());
    }

    #[tokio::test]
    async fn test_issues_verdict_collects_codes() {
        let analyzer = sh("echo \"$1: SC2154\"; echo SC2086 >&2; exit 1");
        let verdict = analyzer
            .analyze(Path::new("."), &[PathBuf::from("job/script")])
            .await
            .expect("analyze");
        assert_eq!(verdict.severity, Severity::Issues);
        assert_eq!(verdict.exit_code, Some(1));
        assert!(verdict.output.contains("job/script: SC2154"));
        assert_eq!(verdict.codes, vec!["SC2154", "SC2086"]);
        assert!(!verdict.timed_out);
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.sh"), "ls\n").unwrap();
        let analyzer = sh("test -f \"$1\"");
        let verdict = analyzer
            .analyze(dir.path(), &[PathBuf::from("a.sh")])
            .await
            .expect("analyze");
        assert_eq!(verdict.severity, Severity::Clean);
    }

    #[tokio::test]
    async fn test_unknown_exit_code_is_file_error() {
        let verdict = sh("exit 7")
            .analyze(Path::new("."), &[])
            .await
            .expect("analyze");
        assert_eq!(verdict.severity, Severity::FileError);
    }

    #[tokio::test]
    async fn test_timeout_yields_file_error_verdict() {
        let analyzer = ShellCheck::new(AnalyzerConfig {
            command: vec!["sh".into(), "-c".into(), "sleep 5".into()],
            timeout: Some(Duration::from_millis(200)),
        })
        .expect("analyzer");
        let verdict = analyzer
            .analyze(Path::new("."), &[PathBuf::from("x")])
            .await
            .expect("analyze");
        assert!(verdict.timed_out);
        assert_eq!(verdict.severity, Severity::FileError);
        assert!(verdict.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let analyzer = ShellCheck::new(AnalyzerConfig::from_command_line(
            "yaml-shellcheck-no-such-analyzer",
        ))
        .expect("analyzer");
        let err = analyzer.analyze(Path::new("."), &[]).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Spawn { .. }));
    }
}
