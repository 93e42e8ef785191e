//! Run-level errors.
//!
//! Per-file problems (bad YAML, wrong script shape) are not errors here; they
//! are recorded in the file's report and the run continues.

use yaml_shellcheck_core::MaterializeError;

use crate::severity::Severity;

/// The external analyzer could not be run.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer command is empty")]
    EmptyCommand,

    #[error("failed to start analyzer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for analyzer `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A failure that aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

impl RunError {
    /// Outcome reported when the run aborts with this error.
    pub fn severity(&self) -> Severity {
        match self {
            RunError::Materialize(_) => Severity::FileError,
            RunError::Analyzer(_) => Severity::BadOptions,
        }
    }
}
