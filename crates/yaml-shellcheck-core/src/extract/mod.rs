//! Per-dialect extraction of shell fragments.
//!
//! Each dialect has one pure extractor `fn(&Node, &Path) -> Result<Vec<ScriptFragment>>`;
//! [`extractor_for`] is the dispatch table. The extractors share [`flatten`]
//! and the placeholder substitution in [`crate::placeholder`].

mod ansible;
mod bitbucket;
mod circleci;
mod drone;
mod github;
mod gitlab;
mod taskfile;

use std::path::Path;

use tracing::{debug, info};

use crate::dialect::{classify, Dialect};
use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};
use crate::placeholder::{reference_placeholder, substitute, Marker};

/// Extraction strategy for one dialect.
pub type Extractor = fn(&Node, &Path) -> Result<Vec<ScriptFragment>, ExtractError>;

/// Strategy table keyed by dialect. `Unrecognized` has no extractor.
pub fn extractor_for(dialect: Dialect) -> Option<Extractor> {
    match dialect {
        Dialect::BitbucketPipelines => Some(bitbucket::extract),
        Dialect::GitHubWorkflow => Some(github::extract_workflow),
        Dialect::GitHubAction => Some(github::extract_action),
        Dialect::DroneCI => Some(drone::extract),
        Dialect::CircleCI => Some(circleci::extract),
        Dialect::GitLabCI => Some(gitlab::extract),
        Dialect::AnsiblePlaybook => Some(ansible::extract),
        Dialect::TaskFile => Some(taskfile::extract),
        Dialect::Unrecognized => None,
    }
}

/// Extract all fragments of a document already classified as `dialect`.
pub fn extract(
    root: &Node,
    dialect: Dialect,
    source: &Path,
) -> Result<Vec<ScriptFragment>, ExtractError> {
    match extractor_for(dialect) {
        Some(extractor) => extractor(root, source),
        None => Ok(Vec::new()),
    }
}

/// Classification and fragments of every document in one input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Dialect of each document, in stream order.
    pub dialects: Vec<Dialect>,

    /// Fragments of all documents, in document order.
    pub fragments: Vec<ScriptFragment>,
}

impl Extraction {
    /// No document matched a known dialect.
    pub fn is_unrecognized(&self) -> bool {
        self.dialects.iter().all(|d| *d == Dialect::Unrecognized)
    }
}

/// Classify and extract each document of a file.
///
/// With more than one document, labels are prefixed with `doc[<n>]`.
pub fn extract_documents(documents: &[Node], source: &Path) -> Result<Extraction, ExtractError> {
    let mut extraction = Extraction::default();
    let multi = documents.len() > 1;

    for (index, document) in documents.iter().enumerate() {
        let dialect = classify(document);
        info!(file = %source.display(), document = index, dialect = %dialect, "classified document");
        extraction.dialects.push(dialect);

        for mut fragment in extract(document, dialect, source)? {
            if multi {
                fragment.label = fragment.label.prefixed(format!("doc[{index}]"));
            }
            debug!(
                file = %source.display(),
                label = %fragment.label,
                lines = fragment.lines.len(),
                "extracted fragment"
            );
            extraction.fragments.push(fragment);
        }
    }

    if documents.is_empty() {
        info!(file = %source.display(), "empty document");
        extraction.dialects.push(Dialect::Unrecognized);
    }
    Ok(extraction)
}

/// Flatten a scalar or arbitrarily nested sequence of scalars into lines.
///
/// Depth-first, left to right; multi-line scalars contribute one entry per
/// line. `!reference` tags become a single placeholder comment and nulls are
/// skipped. A mapping anywhere in the structure is a shape error.
pub fn flatten(node: &Node, label: &Label) -> Result<Vec<String>, ExtractError> {
    let mut lines = Vec::new();
    flatten_into(node, label, &mut lines)?;
    Ok(lines)
}

fn flatten_into(node: &Node, label: &Label, out: &mut Vec<String>) -> Result<(), ExtractError> {
    match node {
        Node::Null => {}
        Node::String(s) => out.extend(s.lines().map(str::to_string)),
        Node::Number(n) => out.push(n.clone()),
        Node::Bool(b) => out.push(b.to_string()),
        Node::Sequence(items) => {
            for item in items {
                flatten_into(item, label, out)?;
            }
        }
        Node::Tagged { tag, value } if tag == "reference" => out.push(reference_placeholder(value)),
        Node::Tagged { value, .. } => flatten_into(value, label, out)?,
        Node::Mapping(_) => {
            return Err(ExtractError::shape(
                label,
                "string or sequence of strings",
                node.kind(),
            ))
        }
    }
    Ok(())
}

/// [`flatten`] followed by placeholder substitution of `markers`.
pub(crate) fn script_lines(
    node: &Node,
    label: &Label,
    markers: &[Marker],
) -> Result<Vec<String>, ExtractError> {
    Ok(flatten(node, label)?
        .into_iter()
        .map(|line| substitute(&line, markers).into_owned())
        .collect())
}

/// Push a fragment unless it has no lines.
pub(crate) fn push_fragment(out: &mut Vec<ScriptFragment>, fragment: ScriptFragment) {
    if fragment.lines.is_empty() {
        debug!(label = %fragment.label, "skipping empty script");
        return;
    }
    out.push(fragment);
}

/// Items of an optional sequence; absent or null is empty.
pub(crate) fn optional_sequence<'a>(
    node: Option<&'a Node>,
    label: &Label,
) -> Result<&'a [Node], ExtractError> {
    match node {
        None | Some(Node::Null) => Ok(&[]),
        Some(Node::Sequence(items)) => Ok(items),
        Some(other) => Err(ExtractError::shape(label, "sequence", other.kind())),
    }
}

/// Entries of an optional mapping; absent or null yields `None`.
pub(crate) fn optional_mapping<'a>(
    node: Option<&'a Node>,
    label: &Label,
) -> Result<Option<&'a crate::document::Mapping>, ExtractError> {
    match node {
        None | Some(Node::Null) => Ok(None),
        Some(Node::Mapping(m)) => Ok(Some(m)),
        Some(other) => Err(ExtractError::shape(label, "mapping", other.kind())),
    }
}

/// Label component for list item `index`: the first of `keys` with a scalar
/// value, else `<list>[<index>]`.
pub(crate) fn item_name(item: &Node, index: usize, keys: &[&str], list: &str) -> String {
    keys.iter()
        .find_map(|k| item.get(k).and_then(Node::scalar_text))
        .unwrap_or_else(|| format!("{list}[{index}]"))
}
