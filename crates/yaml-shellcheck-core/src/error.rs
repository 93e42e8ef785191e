//! Error taxonomy for parsing, extraction and materialization.

use std::path::PathBuf;

/// An input file could not be turned into a document tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A recognized document has a script location of the wrong shape.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{label}: expected {expected}, found {found}")]
    UnexpectedShape {
        label: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl ExtractError {
    pub(crate) fn shape(label: impl ToString, expected: &'static str, found: &'static str) -> Self {
        Self::UnexpectedShape {
            label: label.to_string(),
            expected,
            found,
        }
    }
}

/// Writing a script into the working directory failed.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to create working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
