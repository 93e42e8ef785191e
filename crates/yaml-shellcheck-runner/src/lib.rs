//! yaml-shellcheck runner
//!
//! Drives a run over a list of input files:
//! - Extracts and materializes shell scripts via `yaml-shellcheck-core`
//! - Invokes the external analyzer with an optional timeout
//! - Aggregates analyzer exit statuses into one outcome

pub mod analyzer;
pub mod error;
pub mod pipeline;
pub mod severity;

// Re-export key types
pub use analyzer::{
    diagnostic_codes, Analyzer, AnalyzerConfig, AnalyzerVerdict, ShellCheck,
    MAX_PATHS_PER_INVOCATION,
};
pub use error::{AnalyzerError, RunError};
pub use pipeline::{run, FileReport, FileStatus, RunConfig, RunReport};
pub use severity::Severity;
