//! CircleCI: `run` steps of `jobs.*.steps` and reusable `commands.*.steps`.
//!
//! `run` is a string, a list, or a mapping with `command` and an optional
//! `shell`. Mappings without `command` are directives and are skipped.

use std::path::Path;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};
use crate::placeholder::Marker;

use super::{optional_mapping, optional_sequence, push_fragment, script_lines};

/// CircleCI runs steps with bash unless told otherwise.
const DEFAULT_SHELL: &str = "/bin/bash";

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    for section in ["jobs", "commands"] {
        let section_label = Label::root().child(section);
        let Some(entries) = optional_mapping(root.get(section), &section_label)? else {
            continue;
        };
        for (name, entry) in entries.iter() {
            let label = if section == "jobs" {
                Label::root().child(name)
            } else {
                section_label.child(name)
            };
            let steps = optional_sequence(entry.get("steps"), &label.child("steps"))?;
            walk_steps(steps, &label, source, &mut fragments)?;
        }
    }
    Ok(fragments)
}

fn walk_steps(
    steps: &[Node],
    label: &Label,
    source: &Path,
    out: &mut Vec<ScriptFragment>,
) -> Result<(), ExtractError> {
    for (i, step) in steps.iter().enumerate() {
        // `- checkout` and friends are plain strings
        let Node::Mapping(step_map) = step else {
            continue;
        };
        let step_label = label.child(format!("steps[{i}]"));
        for (key, value) in step_map.iter() {
            match key {
                "run" => {
                    if let Some(fragment) = run_fragment(value, step_label.child("run"), source)? {
                        push_fragment(out, fragment);
                    }
                }
                "when" | "unless" => {
                    let nested_label = step_label.child(key);
                    let nested = optional_sequence(value.get("steps"), &nested_label)?;
                    walk_steps(nested, &nested_label, source, out)?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn run_fragment(
    run: &Node,
    label: Label,
    source: &Path,
) -> Result<Option<ScriptFragment>, ExtractError> {
    let (command, shell) = match run {
        Node::Mapping(m) => match m.get("command") {
            Some(command) => (command, m.get("shell").and_then(Node::scalar_text)),
            None => return Ok(None),
        },
        Node::String(_) | Node::Sequence(_) | Node::Tagged { .. } => (run, None),
        Node::Null => return Ok(None),
        other => {
            return Err(ExtractError::shape(
                label,
                "string, sequence or mapping",
                other.kind(),
            ))
        }
    };
    let lines = script_lines(command, &label, &[Marker::PipelineValue])?;
    let shell = shell.unwrap_or_else(|| DEFAULT_SHELL.to_string());
    Ok(Some(
        ScriptFragment::new(source, label, lines).with_interpreter(&shell),
    ))
}
