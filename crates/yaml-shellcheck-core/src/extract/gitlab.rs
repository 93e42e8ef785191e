//! GitLab CI: `before_script`, `script` and `after_script` of every job.
//!
//! GitLab runs `before_script` and `script` in one shell, but each section
//! becomes its own fragment. `!reference` tags are not resolved. Script
//! text is passed through without placeholder substitution.

use std::path::Path;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};

use super::{flatten, push_fragment};

const SECTIONS: [&str; 3] = ["before_script", "script", "after_script"];

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    let Some(root) = root.as_mapping() else {
        return Ok(fragments);
    };
    for (job, value) in root.iter() {
        let Some(job_map) = value.as_mapping() else {
            continue;
        };
        for section in SECTIONS {
            let Some(script) = job_map.get(section) else {
                continue;
            };
            let label = Label::root().child(job).child(section);
            let lines = flatten(script, &label)?;
            push_fragment(&mut fragments, ScriptFragment::new(source, label, lines));
        }
    }
    Ok(fragments)
}
