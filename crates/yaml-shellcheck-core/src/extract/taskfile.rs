//! Taskfile (go-task): `cmd` / `cmds` of every task.
//!
//! Deferred commands run after the task body, so each `defer` is a
//! separate fragment. `{task: ...}` calls are skipped.

use std::path::Path;

use tracing::debug;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};
use crate::placeholder::Marker;

use super::{optional_mapping, push_fragment, script_lines};

const MARKERS: [Marker; 1] = [Marker::GoTemplate];

#[derive(Default)]
struct TaskScripts {
    lines: Vec<String>,
    deferred: Vec<(usize, Vec<String>)>,
}

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    let Some(tasks) = optional_mapping(root.get("tasks"), &Label::root().child("tasks"))? else {
        return Ok(fragments);
    };

    for (name, task) in tasks.iter() {
        let label = Label::root().child(name);
        let cmds_label = label.child("cmds");
        let mut scripts = TaskScripts::default();
        match task {
            Node::Null => continue,
            Node::String(_) | Node::Sequence(_) => collect_cmds(task, &cmds_label, &mut scripts)?,
            Node::Mapping(t) => {
                if let Some(cmd) = t.get("cmd") {
                    scripts.lines.extend(script_lines(cmd, &label.child("cmd"), &MARKERS)?);
                }
                if let Some(cmds) = t.get("cmds") {
                    collect_cmds(cmds, &cmds_label, &mut scripts)?;
                }
            }
            other => {
                return Err(ExtractError::shape(
                    label,
                    "mapping, string or sequence",
                    other.kind(),
                ))
            }
        }

        push_fragment(
            &mut fragments,
            ScriptFragment::new(source, cmds_label, scripts.lines),
        );
        for (index, lines) in scripts.deferred {
            let defer_label = label.child(format!("defer[{index}]"));
            push_fragment(&mut fragments, ScriptFragment::new(source, defer_label, lines));
        }
    }
    Ok(fragments)
}

fn collect_cmds(cmds: &Node, label: &Label, scripts: &mut TaskScripts) -> Result<(), ExtractError> {
    let Node::Sequence(items) = cmds else {
        scripts.lines.extend(script_lines(cmds, label, &MARKERS)?);
        return Ok(());
    };
    for (i, item) in items.iter().enumerate() {
        let Node::Mapping(entry) = item else {
            scripts.lines.extend(script_lines(item, label, &MARKERS)?);
            continue;
        };
        if let Some(cmd) = entry.get("cmd") {
            scripts.lines.extend(script_lines(cmd, label, &MARKERS)?);
        } else if let Some(defer) = entry.get("defer") {
            match defer {
                Node::Mapping(_) => debug!(label = %label, "skipping deferred task call"),
                other => scripts
                    .deferred
                    .push((i, script_lines(other, label, &MARKERS)?)),
            }
        } else if entry.contains_key("task") {
            debug!(label = %label, "skipping task call");
        }
    }
    Ok(())
}
