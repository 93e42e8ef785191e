//! yaml-shellcheck - run ShellCheck on shell scripts embedded in YAML
//!
//! Supported files: Bitbucket Pipelines, GitHub Actions workflows and
//! actions, Drone CI, CircleCI, GitLab CI, Ansible playbooks and task files,
//! and Taskfiles.
//!
//! Analyzer output goes to stdout, logs to stderr. The exit code is the
//! worst analyzer status over all files (0 clean, 1 issues, 2 file error,
//! 3 bad syntax, 4 bad options).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, Level};

use yaml_shellcheck_core::DEFAULT_SHEBANG;
use yaml_shellcheck_runner::{run, AnalyzerConfig, RunConfig, RunError, Severity, ShellCheck};

#[derive(Parser, Debug)]
#[command(name = "yaml-shellcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run ShellCheck on shell scripts embedded in CI/automation YAML files", long_about = None)]
struct Cli {
    /// YAML files to check
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output directory for extracted scripts (default: a temporary directory)
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Keep the extracted scripts after the run
    #[arg(short, long)]
    keep: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Default shebang line for extracted scripts
    #[arg(short, long, env = "YAML_SHELLCHECK_SHELL", default_value = DEFAULT_SHEBANG)]
    shell: String,

    /// Analyzer command; extra options may follow the program name
    #[arg(short, long, env = "YAML_SHELLCHECK_COMMAND", default_value = "shellcheck")]
    command: String,

    /// Analyzer timeout in seconds per invocation (0 = no timeout)
    #[arg(long, env = "YAML_SHELLCHECK_TIMEOUT", default_value_t = 0)]
    timeout: u64,

    /// Number of input files processed concurrently
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Print a JSON run report after the analyzer output
    #[arg(long)]
    report: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            outdir: self.outdir.clone(),
            keep: self.keep,
            shebang: shebang_line(&self.shell),
            jobs: usize::from(self.jobs),
        }
    }

    fn analyzer_config(&self) -> AnalyzerConfig {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        AnalyzerConfig::from_command_line(&self.command).with_timeout(timeout)
    }
}

/// `/bin/bash` and `#!/bin/bash` both mean the same shebang.
fn shebang_line(shell: &str) -> String {
    let shell = shell.trim();
    if shell.starts_with("#!") {
        shell.to_string()
    } else {
        format!("#!{shell}")
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    yaml_shellcheck_core::init_tracing(cli.json, level);
    debug!(?cli, "parsed arguments");

    let code = match execute(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

async fn execute(cli: &Cli) -> Result<i32> {
    let analyzer =
        ShellCheck::new(cli.analyzer_config()).context("invalid analyzer command")?;
    let report = run(&cli.files, &cli.run_config(), &analyzer)
        .await
        .context("run aborted")?;

    for output in report.analyzer_output() {
        print!("{output}");
    }
    if cli.report {
        println!(
            "{}",
            report.to_json_pretty().context("failed to serialize report")?
        );
    }
    Ok(report.exit_code())
}

/// Run-level failures keep their severity; anything else is a usage problem.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<RunError>()
        .map(RunError::severity)
        .unwrap_or(Severity::BadOptions)
        .exit_code()
}
