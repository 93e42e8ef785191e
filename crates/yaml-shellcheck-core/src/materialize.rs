//! Writing fragments as standalone shell scripts.
//!
//! Layout: `<workdir>/<source path>/<label parts>`. Every path component is
//! sanitized, and a path already used in the run gets a digest suffix.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::MaterializeError;
use crate::fragment::{Label, ScriptFragment};

/// Shebang used when neither the fragment nor the caller provides one.
pub const DEFAULT_SHEBANG: &str = "#!/bin/sh -e";

const TEMP_PREFIX: &str = "yaml_shellcheck_";

/// Longest path component written, well below the usual 255-byte limit.
const MAX_COMPONENT_LEN: usize = 100;

/// A fragment written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedScript {
    pub source: PathBuf,
    pub label: Label,

    /// Absolute location of the script.
    pub path: PathBuf,

    /// Location relative to the working directory, as passed to the analyzer.
    pub relative: PathBuf,

    /// Shebang line written at the top of the file.
    pub shebang: String,
}

/// Scoped output directory for one run.
///
/// Dropping it removes what the run created unless `keep` was requested.
/// A pre-existing caller directory is never removed, only the per-source
/// subtrees reserved in this run.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    temp: Option<TempDir>,
    created: bool,
    keep: bool,
    reserved: HashSet<PathBuf>,
    reserved_order: Vec<PathBuf>,
}

impl WorkDir {
    /// Use `outdir` if given, otherwise a fresh temporary directory.
    pub fn create(outdir: Option<&Path>, keep: bool) -> Result<Self, MaterializeError> {
        match outdir {
            Some(path) => Self::at(path, keep),
            None => Self::temporary(keep),
        }
    }

    pub fn temporary(keep: bool) -> Result<Self, MaterializeError> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|source| MaterializeError::WorkDir {
                path: std::env::temp_dir(),
                source,
            })?;
        let root = temp.path().to_path_buf();
        debug!(dir = %root.display(), "created working dir");
        Ok(Self {
            root,
            temp: Some(temp),
            created: true,
            keep,
            reserved: HashSet::new(),
            reserved_order: Vec::new(),
        })
    }

    pub fn at(path: &Path, keep: bool) -> Result<Self, MaterializeError> {
        let existed = path.exists();
        std::fs::create_dir_all(path).map_err(|source| MaterializeError::WorkDir {
            path: path.to_path_buf(),
            source,
        })?;
        let root = std::fs::canonicalize(path).map_err(|source| MaterializeError::WorkDir {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root,
            temp: None,
            created: !existed,
            keep,
            reserved: HashSet::new(),
            reserved_order: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    /// Reserve a unique subdirectory for scripts of `source`.
    ///
    /// Reservation happens in input order before any concurrent work, so
    /// per-file writers never share a directory.
    pub fn reserve(&mut self, source: &Path) -> ScriptDir {
        let base = source_dir_name(source);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.conflicts(&candidate) {
            candidate = suffixed(&base, &n.to_string());
            n += 1;
        }
        self.reserved.insert(candidate.clone());
        self.reserved_order.push(candidate.clone());
        ScriptDir {
            root: self.root.clone(),
            relative: candidate,
            taken: HashSet::new(),
        }
    }

    fn conflicts(&self, candidate: &Path) -> bool {
        self.reserved
            .iter()
            .any(|r| r.starts_with(candidate) || candidate.starts_with(r))
    }

    fn cleanup_reserved(&self) {
        for relative in self.reserved_order.iter().rev() {
            let dir = self.root.join(relative);
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!(dir = %dir.display(), error = %e, "failed to remove script directory");
                    continue;
                }
            }
            // drop now-empty parents, stopping at the first non-empty one
            let mut parent = dir.parent();
            while let Some(p) = parent {
                if p == self.root || std::fs::remove_dir(p).is_err() {
                    break;
                }
                parent = p.parent();
            }
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.keep {
            if let Some(temp) = self.temp.take() {
                let path = temp.keep();
                debug!(dir = %path.display(), "keeping working dir");
            }
            return;
        }
        if let Some(temp) = self.temp.take() {
            if let Err(e) = temp.close() {
                warn!(dir = %self.root.display(), error = %e, "failed to remove working dir");
            } else {
                debug!(dir = %self.root.display(), "removed working dir");
            }
        } else if self.created {
            match std::fs::remove_dir_all(&self.root) {
                Ok(()) => debug!(dir = %self.root.display(), "removed working dir"),
                Err(e) => {
                    warn!(dir = %self.root.display(), error = %e, "failed to remove working dir")
                }
            }
        } else {
            self.cleanup_reserved();
        }
    }
}

/// Output directory for the scripts of one input file.
#[derive(Debug)]
pub struct ScriptDir {
    root: PathBuf,
    relative: PathBuf,
    taken: HashSet<PathBuf>,
}

impl ScriptDir {
    /// Directory relative to the working directory.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Working directory the relative paths are based on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one fragment.
    pub fn materialize(
        &mut self,
        fragment: &ScriptFragment,
        default_shebang: &str,
    ) -> Result<MaterializedScript, MaterializeError> {
        let relative = self.unique_path(&fragment.label);
        let path = self.root.join(&relative);
        let (shebang, content) = render_script(fragment, default_shebang);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MaterializeError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, content).map_err(|source| MaterializeError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(file = %relative.display(), label = %fragment.label, "wrote script");

        Ok(MaterializedScript {
            source: fragment.source.clone(),
            label: fragment.label.clone(),
            path,
            relative,
            shebang,
        })
    }

    /// Write all fragments, in order.
    pub fn materialize_all(
        &mut self,
        fragments: &[ScriptFragment],
        default_shebang: &str,
    ) -> Result<Vec<MaterializedScript>, MaterializeError> {
        fragments
            .iter()
            .map(|fragment| self.materialize(fragment, default_shebang))
            .collect()
    }

    fn unique_path(&mut self, label: &Label) -> PathBuf {
        let mut parts: Vec<String> = label.parts().iter().map(|p| sanitize_component(p)).collect();
        if parts.is_empty() {
            parts.push("script".to_string());
        }
        let nested: PathBuf = parts.iter().collect();
        let mut candidate = self.relative.join(&nested);

        if self.conflicts(&candidate) {
            let flat = format!(
                "{}-{}",
                truncated(&parts.join("_"), MAX_COMPONENT_LEN - 9),
                short_digest(&label.to_string())
            );
            let base = self.relative.join(flat);
            candidate = base.clone();
            let mut n = 2;
            while self.conflicts(&candidate) {
                candidate = suffixed(&base, &n.to_string());
                n += 1;
            }
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    fn conflicts(&self, candidate: &Path) -> bool {
        self.taken
            .iter()
            .any(|t| t.starts_with(candidate) || candidate.starts_with(t))
    }
}

/// Shebang line and file content for a fragment.
///
/// A fragment that already starts with `#!` keeps its own line.
pub fn render_script(fragment: &ScriptFragment, default_shebang: &str) -> (String, String) {
    let body = fragment.body();
    if let Some(shebang) = &fragment.shebang {
        return (shebang.clone(), format!("{shebang}\n{body}\n"));
    }
    match fragment.lines.first() {
        Some(first) if first.starts_with("#!") => (first.clone(), format!("{body}\n")),
        _ => (
            default_shebang.to_string(),
            format!("{default_shebang}\n{body}\n"),
        ),
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
///
/// Components longer than 100 bytes are cut and end in an 8-hex digest of
/// the full name, so distinct long names stay distinct.
pub fn sanitize_component(part: &str) -> String {
    let cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if matches!(cleaned.as_str(), "" | "." | "..") {
        "_".to_string()
    } else if cleaned.len() > MAX_COMPONENT_LEN {
        format!(
            "{}-{}",
            truncated(&cleaned, MAX_COMPONENT_LEN - 9),
            short_digest(&cleaned)
        )
    } else {
        cleaned
    }
}

// sanitized text is ASCII, so any byte index is a char boundary
fn truncated(text: &str, max: usize) -> &str {
    &text[..text.len().min(max)]
}

fn source_dir_name(source: &Path) -> PathBuf {
    let parts: PathBuf = source
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(sanitize_component(&part.to_string_lossy())),
            Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir => None,
        })
        .collect();
    if parts.as_os_str().is_empty() {
        PathBuf::from("input")
    } else {
        parts
    }
}

fn short_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())[..8].to_string()
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-");
    name.push(suffix);
    PathBuf::from(name)
}
