//! yaml-shellcheck core library
//!
//! Loads CI/automation YAML, decides which dialect a document is written in,
//! extracts the embedded shell fragments and writes them out as scripts.

pub mod dialect;
pub mod document;
pub mod error;
pub mod extract;
pub mod fragment;
pub mod materialize;
pub mod placeholder;
pub mod telemetry;

pub use dialect::{classify, Dialect};

pub use document::{load_documents, parse_documents, Mapping, Node};

pub use error::{ExtractError, MaterializeError, ParseError};

pub use extract::{extract, extract_documents, extractor_for, flatten, Extraction, Extractor};

pub use fragment::{Label, ScriptFragment};

pub use materialize::{
    render_script, sanitize_component, MaterializedScript, ScriptDir, WorkDir, DEFAULT_SHEBANG,
};

pub use placeholder::{substitute, Marker};

pub use telemetry::init_tracing;
