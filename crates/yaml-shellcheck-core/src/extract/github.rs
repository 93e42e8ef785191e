//! GitHub Actions workflows (`jobs.<id>.steps[*].run`) and composite
//! actions (`runs.steps[*].run`).
//!
//! A step-level `shell:` is not applied; fragments use the configured
//! default shebang.

use std::path::Path;

use tracing::debug;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};
use crate::placeholder::Marker;

use super::{item_name, optional_mapping, optional_sequence, push_fragment, script_lines};

pub(super) fn extract_workflow(
    root: &Node,
    source: &Path,
) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    let Some(jobs) = optional_mapping(root.get("jobs"), &Label::root().child("jobs"))? else {
        return Ok(fragments);
    };
    for (job_id, job) in jobs.iter() {
        let label = Label::root().child(job_id);
        extract_steps(job.get("steps"), &label, source, &mut fragments)?;
    }
    Ok(fragments)
}

pub(super) fn extract_action(
    root: &Node,
    source: &Path,
) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    let label = Label::root().child("runs");
    if let Some(runs) = root.get("runs") {
        extract_steps(runs.get("steps"), &label, source, &mut fragments)?;
    }
    Ok(fragments)
}

fn extract_steps(
    steps: Option<&Node>,
    label: &Label,
    source: &Path,
    out: &mut Vec<ScriptFragment>,
) -> Result<(), ExtractError> {
    for (i, step) in optional_sequence(steps, &label.child("steps"))?.iter().enumerate() {
        let step_label = label.child(item_name(step, i, &["id"], "steps"));
        let run = match step.get("run") {
            None | Some(Node::Null) => continue,
            Some(run @ (Node::String(_) | Node::Tagged { .. })) => run,
            Some(other) => {
                return Err(ExtractError::shape(step_label.child("run"), "string", other.kind()))
            }
        };
        if let Some(shell) = step.get("shell").and_then(Node::scalar_text) {
            debug!(label = %step_label, shell = %shell, "step shell override is not applied");
        }
        let run_label = step_label.child("run");
        let lines = script_lines(run, &run_label, &[Marker::GitHubExpression])?;
        push_fragment(out, ScriptFragment::new(source, run_label, lines));
    }
    Ok(())
}
