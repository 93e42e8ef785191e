//! Structural fingerprinting of CI/automation documents.

use serde::{Deserialize, Serialize};

use crate::document::{Mapping, Node};

/// Schema family a document belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Dialect {
    #[serde(rename = "bitbucket_pipelines")]
    BitbucketPipelines,
    #[serde(rename = "github_workflow")]
    GitHubWorkflow,
    #[serde(rename = "github_action")]
    GitHubAction,
    #[serde(rename = "drone_ci")]
    DroneCI,
    #[serde(rename = "circleci")]
    CircleCI,
    #[serde(rename = "gitlab_ci")]
    GitLabCI,
    #[serde(rename = "ansible_playbook")]
    AnsiblePlaybook,
    #[serde(rename = "taskfile")]
    TaskFile,
    #[serde(rename = "unrecognized")]
    Unrecognized,
}

impl Dialect {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::BitbucketPipelines => "Bitbucket Pipelines",
            Dialect::GitHubWorkflow => "GitHub Actions workflow",
            Dialect::GitHubAction => "GitHub Action",
            Dialect::DroneCI => "Drone CI",
            Dialect::CircleCI => "CircleCI",
            Dialect::GitLabCI => "GitLab CI",
            Dialect::AnsiblePlaybook => "Ansible",
            Dialect::TaskFile => "Taskfile",
            Dialect::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const GITLAB_SCRIPT_KEYS: [&str; 3] = ["script", "before_script", "after_script"];
const GITLAB_JOB_KEYS: [&str; 5] = ["script", "before_script", "after_script", "extends", "stage"];
const ANSIBLE_PLAY_KEYS: [&str; 5] = ["tasks", "block", "hosts", "shell", "ansible.builtin.shell"];

/// Classify a document root. First matching rule wins.
pub fn classify(root: &Node) -> Dialect {
    match root {
        Node::Mapping(m) => classify_mapping(m),
        Node::Sequence(items) if is_ansible(items) => Dialect::AnsiblePlaybook,
        _ => Dialect::Unrecognized,
    }
}

fn classify_mapping(m: &Mapping) -> Dialect {
    if m.contains_key("pipelines") {
        Dialect::BitbucketPipelines
    } else if m.contains_key("on") && m.contains_key("jobs") {
        Dialect::GitHubWorkflow
    } else if is_github_action(m) {
        Dialect::GitHubAction
    } else if m.get("kind").and_then(Node::as_str) == Some("pipeline") && m.contains_key("steps") {
        Dialect::DroneCI
    } else if m.contains_key("version") && jobs_have_steps(m) {
        Dialect::CircleCI
    } else if is_gitlab(m) {
        Dialect::GitLabCI
    } else if is_taskfile(m) {
        Dialect::TaskFile
    } else {
        Dialect::Unrecognized
    }
}

fn is_github_action(m: &Mapping) -> bool {
    if m.contains_key("jobs") {
        return false;
    }
    match m.get("runs") {
        Some(runs) => m.contains_key("inputs") || runs.has("using"),
        None => false,
    }
}

fn jobs_have_steps(m: &Mapping) -> bool {
    m.get("jobs")
        .and_then(Node::as_mapping)
        .is_some_and(|jobs| jobs.values().any(|job| job.has("steps")))
}

fn is_gitlab(m: &Mapping) -> bool {
    if m.contains_key("stages") || GITLAB_SCRIPT_KEYS.iter().any(|k| m.contains_key(k)) {
        return true;
    }
    if m.keys().any(|k| k.starts_with('.')) {
        return true;
    }
    m.values()
        .any(|v| GITLAB_JOB_KEYS.iter().any(|k| v.has(k)))
}

fn is_ansible(items: &[Node]) -> bool {
    items
        .iter()
        .any(|item| ANSIBLE_PLAY_KEYS.iter().any(|k| item.has(k)))
}

fn is_taskfile(m: &Mapping) -> bool {
    if !m.contains_key("version") {
        return false;
    }
    let has_commands = m.get("tasks").and_then(Node::as_mapping).is_some_and(|tasks| {
        tasks.values().any(|task| match task {
            Node::Mapping(t) => t.contains_key("cmds") || t.contains_key("cmd"),
            Node::String(_) | Node::Sequence(_) => true,
            _ => false,
        })
    });
    has_commands || m.values().any(|v| v.any_string(&mut |s| is_go_template(s)))
}

fn is_go_template(s: &str) -> bool {
    s.match_indices("{{").any(|(i, _)| s[i + 2..].trim_start().starts_with('.'))
}
