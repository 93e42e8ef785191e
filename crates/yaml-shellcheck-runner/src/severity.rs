//! Analyzer severity taxonomy and outcome aggregation.

use serde::{Deserialize, Serialize};

/// ShellCheck exit status, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// All files analyzed, no issues.
    #[default]
    Clean,
    /// All files analyzed, some issues found.
    Issues,
    /// Some files could not be processed.
    FileError,
    /// Bad invocation syntax.
    BadSyntax,
    /// Bad invocation options, or the analyzer could not be run at all.
    BadOptions,
}

impl Severity {
    /// Map an analyzer exit code. `None` (killed by a signal) and codes
    /// outside the taxonomy are file errors.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Severity::Clean,
            Some(1) => Severity::Issues,
            Some(3) => Severity::BadSyntax,
            Some(4) => Severity::BadOptions,
            _ => Severity::FileError,
        }
    }

    /// Process exit code for this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Clean => 0,
            Severity::Issues => 1,
            Severity::FileError => 2,
            Severity::BadSyntax => 3,
            Severity::BadOptions => 4,
        }
    }

    /// Worst severity of `items`; `Clean` when empty.
    pub fn aggregate(items: impl IntoIterator<Item = Severity>) -> Severity {
        items.into_iter().max().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Clean => "clean",
            Severity::Issues => "issues",
            Severity::FileError => "file_error",
            Severity::BadSyntax => "bad_syntax",
            Severity::BadOptions => "bad_options",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
