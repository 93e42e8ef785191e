//! Bitbucket Pipelines.
//!
//! Bitbucket has no published schema and nests steps deeply (`step`,
//! `parallel`, `stages`, custom and branch pipelines), so every `script` and
//! `after-script` below `pipelines` is collected, in document order.

use std::path::Path;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};

use super::{flatten, push_fragment};

const SCRIPT_KEYS: [&str; 2] = ["script", "after-script"];

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    if let Some(pipelines) = root.get("pipelines") {
        walk(pipelines, &Label::root().child("pipelines"), source, &mut fragments)?;
    }
    Ok(fragments)
}

fn walk(
    node: &Node,
    label: &Label,
    source: &Path,
    out: &mut Vec<ScriptFragment>,
) -> Result<(), ExtractError> {
    match node {
        Node::Mapping(m) => {
            for (key, value) in m.iter() {
                let label = label.child(key);
                if SCRIPT_KEYS.contains(&key) {
                    let lines = script_lines(value, &label)?;
                    push_fragment(out, ScriptFragment::new(source, label, lines));
                } else {
                    walk(value, &label, source, out)?;
                }
            }
        }
        Node::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &label.child(i.to_string()), source, out)?;
            }
        }
        Node::Tagged { value, .. } => walk(value, label, source, out)?,
        Node::Null | Node::Bool(_) | Node::Number(_) | Node::String(_) => {}
    }
    Ok(())
}

/// Script items may be `pipe:` invocations; those become a comment line.
fn script_lines(node: &Node, label: &Label) -> Result<Vec<String>, ExtractError> {
    let Node::Sequence(items) = node else {
        return flatten(node, label);
    };
    let mut lines = Vec::new();
    for item in items {
        match item.get("pipe") {
            Some(pipe) => {
                let name = pipe.scalar_text().unwrap_or_default();
                lines.push(format!("# pipe: {}", name.replace(['\n', '\r'], " ")));
            }
            None => lines.extend(flatten(item, label)?),
        }
    }
    Ok(lines)
}
