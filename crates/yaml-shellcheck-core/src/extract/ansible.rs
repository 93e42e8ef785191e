//! Ansible: `shell` / `ansible.builtin.shell` tasks in playbooks and task
//! files, walking nested task lists.
//!
//! Other shell-running modules (`command`, `script`, `raw`) are not handled.

use std::path::Path;

use tracing::debug;

use crate::document::{Mapping, Node};
use crate::error::ExtractError;
use crate::fragment::{Label, ScriptFragment};
use crate::placeholder::Marker;

use super::{item_name, optional_sequence, push_fragment, script_lines};

const SHELL_KEYS: [&str; 2] = ["shell", "ansible.builtin.shell"];
const TASK_LISTS: [&str; 7] = [
    "pre_tasks",
    "tasks",
    "post_tasks",
    "handlers",
    "block",
    "rescue",
    "always",
];

pub(super) fn extract(root: &Node, source: &Path) -> Result<Vec<ScriptFragment>, ExtractError> {
    let mut fragments = Vec::new();
    if let Some(items) = root.as_sequence() {
        walk_tasks(items, &Label::root(), "root", source, &mut fragments)?;
    }
    Ok(fragments)
}

fn walk_tasks(
    items: &[Node],
    label: &Label,
    list: &str,
    source: &Path,
    out: &mut Vec<ScriptFragment>,
) -> Result<(), ExtractError> {
    for (i, item) in items.iter().enumerate() {
        let Some(task) = item.as_mapping() else {
            continue;
        };
        let task_label = label.child(item_name(item, i, &["name", "hosts"], list));
        for (key, value) in task.iter() {
            if SHELL_KEYS.contains(&key) {
                if let Some(fragment) = shell_fragment(task, value, task_label.child(key), source)? {
                    push_fragment(out, fragment);
                }
            } else if TASK_LISTS.contains(&key) {
                let nested = optional_sequence(Some(value), &task_label.child(key))?;
                walk_tasks(nested, &task_label, key, source, out)?;
            }
        }
    }
    Ok(())
}

fn shell_fragment(
    task: &Mapping,
    value: &Node,
    label: Label,
    source: &Path,
) -> Result<Option<ScriptFragment>, ExtractError> {
    let (script, module_executable) = match value {
        Node::Null => return Ok(None),
        Node::String(_) | Node::Tagged { .. } => (value, None),
        Node::Mapping(m) => match m.get("cmd") {
            Some(cmd) => (cmd, m.get("executable")),
            None => return Err(ExtractError::shape(label, "mapping with cmd", "mapping")),
        },
        other => {
            return Err(ExtractError::shape(
                label,
                "string or mapping with cmd",
                other.kind(),
            ))
        }
    };

    let executable = task
        .get("args")
        .and_then(|args| args.get("executable"))
        .or(module_executable)
        .and_then(Node::scalar_text);

    // `!unsafe` text is never templated, so its braces are shell text
    let markers: &[Marker] = match script {
        Node::Tagged { tag, .. } if tag == "unsafe" => &[],
        _ => &[Marker::Jinja],
    };
    let lines = script_lines(script, &label, markers)?;
    let fragment = ScriptFragment::new(source, label, lines);
    match executable {
        Some(exe) if !exe.contains("sh") => {
            debug!(label = %fragment.label, executable = %exe, "skipping task with unsupported shell");
            Ok(None)
        }
        Some(exe) => Ok(Some(fragment.with_interpreter(&exe))),
        None => Ok(Some(fragment)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_documents;

    fn run(text: &str) -> Result<Vec<ScriptFragment>, ExtractError> {
        let doc = parse_documents(text).expect("parse").remove(0);
        extract(&doc, Path::new("site.yml"))
    }

    #[test]
    fn test_playbook_tasks_and_blocks() {
        let text = "\
- hosts: webservers
  tasks:
    - name: Install Apache
      block:
        - shell: apt-get install -y {{ package }}
        - ansible.builtin.shell:
            cmd: systemctl restart apache2
    - name: Not a shell task
      ansible.builtin.copy: {src: a, dest: b}
  handlers:
    - name: reload
      shell: systemctl reload apache2
";
        let fragments = run(text).expect("extract");
        let labels: Vec<String> = fragments.iter().map(|f| f.label.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "webservers/Install Apache/block[0]/shell",
                "webservers/Install Apache/block[1]/ansible.builtin.shell",
                "webservers/reload/shell",
            ]
        );
        assert_eq!(fragments[0].lines, vec!["apt-get install -y $JINJA_EXPRESSION"]);
        assert_eq!(fragments[1].lines, vec!["systemctl restart apache2"]);
    }

    #[test]
    fn test_executable_sets_shebang_or_skips() {
        let text = "\
- name: bash task
  shell: echo hi
  args:
    executable: /bin/bash
- name: python task
  shell: print(1)
  args:
    executable: /usr/bin/python3
";
        let fragments = run(text).expect("extract");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].shebang.as_deref(), Some("#!/bin/bash"));
    }

    #[test]
    fn test_unsafe_tag_is_literal() {
        let text = "\
- name: literal braces
  shell: !unsafe 'echo {{ not_jinja }}'
- name: templated
  ansible.builtin.shell:
    cmd: !vault echo {{ secret }}
";
        let fragments = run(text).expect("extract");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].label.to_string(), "literal braces/shell");
        assert_eq!(fragments[0].lines, vec!["echo {{ not_jinja }}"]);
        assert_eq!(fragments[1].lines, vec!["echo $JINJA_EXPRESSION"]);
    }

    #[test]
    fn test_shell_sequence_is_shape_error() {
        assert!(run("- shell: [a, b]\n").is_err());
        assert!(run("- shell: {chdir: /tmp}\n").is_err());
    }

    #[test]
    fn test_non_sequence_root_yields_nothing() {
        let doc = Node::Mapping(Mapping::new());
        assert!(extract(&doc, Path::new("x.yml")).unwrap().is_empty());
    }
}
