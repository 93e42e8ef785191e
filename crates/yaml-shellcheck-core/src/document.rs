//! Generic document tree built from parsed YAML.
//!
//! The tree is a closed sum type so that extractors match on shape instead
//! of probing dynamic values. Custom tags (GitLab `!reference`) survive as
//! [`Node::Tagged`]; anchors, aliases and merge keys are already resolved.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ParseError;

/// A node of a parsed YAML document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(String),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
    /// A custom-tagged node; `tag` is stored without the leading `!`.
    Tagged { tag: String, value: Box<Node> },
}

/// Insertion-ordered mapping with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, keeping its position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl Node {
    /// Short name of the node's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Tagged { .. } => "tagged value",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text of a scalar node; numbers and booleans are rendered as written.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Node::String(s) => Some(s.clone()),
            Node::Number(n) => Some(n.clone()),
            Node::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Look up `key` if this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether any string scalar in this subtree satisfies `pred`.
    pub fn any_string(&self, pred: &mut dyn FnMut(&str) -> bool) -> bool {
        match self {
            Node::String(s) => pred(s),
            Node::Sequence(items) => items.iter().any(|item| item.any_string(pred)),
            Node::Mapping(m) => m.values().any(|v| v.any_string(pred)),
            Node::Tagged { value, .. } => value.any_string(pred),
            Node::Null | Node::Bool(_) | Node::Number(_) => false,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n.to_string()),
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(mapping) => Node::Mapping(convert_mapping(mapping)),
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                Node::Tagged {
                    tag: tag.trim_start_matches('!').to_string(),
                    value: Box::new(Node::from(tagged.value)),
                }
            }
        }
    }
}

fn is_merge_key(key: &Value) -> bool {
    matches!(key, Value::String(s) if s == "<<")
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Convert a mapping, applying YAML merge keys.
///
/// Explicit keys win over merged ones and earlier merge sources win over
/// later ones. Merged entries are placed where the `<<` key appeared.
fn convert_mapping(mapping: serde_yaml::Mapping) -> Mapping {
    let explicit: HashSet<String> = mapping
        .keys()
        .filter(|k| !is_merge_key(k))
        .map(key_text)
        .collect();

    let mut out = Mapping::new();
    for (key, value) in mapping {
        if !is_merge_key(&key) {
            out.insert(key_text(&key), Node::from(value));
            continue;
        }
        let sources = match Node::from(value) {
            Node::Mapping(m) => vec![m],
            Node::Sequence(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Node::Mapping(m) => Some(m),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        for source in sources {
            for (k, v) in source.entries {
                if !explicit.contains(&k) && !out.contains_key(&k) {
                    out.entries.push((k, v));
                }
            }
        }
    }
    out
}

/// Parse every document of a YAML stream.
pub fn parse_documents(text: &str) -> Result<Vec<Node>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        documents.push(Node::from(value));
    }
    Ok(documents)
}

/// Read and parse a YAML file.
pub fn load_documents(path: &Path) -> Result<Vec<Node>, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_documents(&text).map_err(|source| ParseError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
