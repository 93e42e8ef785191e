//! Drone CI: `steps[*].commands` and `services[*].commands`.

use std::path::Path;

use crate::document::Node;
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};

use super::{item_name, optional_sequence, push_fragment, script_lines};

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let pipeline = root
        .get("name")
        .and_then(Node::scalar_text)
        .unwrap_or_else(|| "default".to_string());
    let base = Label::root().child(pipeline);

    let mut fragments = Vec::new();
    for section in ["steps", "services"] {
        let list_label = if section == "steps" {
            base.clone()
        } else {
            base.child(section)
        };
        for (i, step) in optional_sequence(root.get(section), &base.child(section))?
            .iter()
            .enumerate()
        {
            // plugin steps have no commands
            let Some(commands) = step.get("commands") else {
                continue;
            };
            let label = list_label.child(item_name(step, i, &["name"], section));
            let lines = script_lines(commands, &label, &[])?;
            push_fragment(&mut fragments, ScriptFragment::new(source, label, lines));
        }
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_documents;

    fn run(text: &str) -> Result<Vec<ScriptFragment>, ExtractError> {
        let doc = parse_documents(text).expect("parse").remove(0);
        extract(&doc, Path::new(".drone.yml"))
    }

    #[test]
    fn test_commands_concatenated_per_step() {
        let text = "\
kind: pipeline
type: docker
name: build
steps:
  - name: test
    image: golang
    commands:
      - go vet
      - go test
  - name: publish
    image: plugins/docker
    settings: {repo: x}
services:
  - name: db
    image: postgres
    commands: [pg_ctl start]
";
        let fragments = run(text).expect("extract");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].label.to_string(), "build/test");
        assert_eq!(fragments[0].lines, vec!["go vet", "go test"]);
        assert_eq!(fragments[1].label.to_string(), "build/services/db");
    }

    #[test]
    fn test_unnamed_pipeline_and_step() {
        let text = "kind: pipeline\nsteps:\n  - commands: [ls]\n";
        let fragments = run(text).expect("extract");
        assert_eq!(fragments[0].label.to_string(), "default/steps[0]");
    }

    #[test]
    fn test_steps_must_be_sequence() {
        assert!(run("kind: pipeline\nsteps: {a: b}\n").is_err());
    }
}
