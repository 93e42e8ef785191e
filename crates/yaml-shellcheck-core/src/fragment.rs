//! Extracted shell fragments.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Hierarchical label of a fragment, e.g. `html/script`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Label(Vec<String>);

impl Label {
    pub fn root() -> Self {
        Self::default()
    }

    /// A new label with `part` appended.
    pub fn child(&self, part: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(part.into());
        Self(parts)
    }

    /// A new label with `part` prepended.
    pub fn prefixed(&self, part: impl Into<String>) -> Self {
        let mut parts = Vec::with_capacity(self.0.len() + 1);
        parts.push(part.into());
        parts.extend(self.0.iter().cloned());
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Shell statements that run as one shell process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptFragment {
    /// Input file the fragment came from.
    pub source: PathBuf,

    /// Where in the document the fragment lives.
    pub label: Label,

    /// Statement lines in execution order.
    pub lines: Vec<String>,

    /// Shebang line to use instead of the configured default.
    pub shebang: Option<String>,
}

impl ScriptFragment {
    pub fn new(source: &Path, label: Label, lines: Vec<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            label,
            lines,
            shebang: None,
        }
    }

    /// Use `#!<interpreter>` for this fragment.
    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.shebang = Some(format!("#!{}", interpreter.trim()));
        self
    }

    /// Statement lines joined into one script body.
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }
}
