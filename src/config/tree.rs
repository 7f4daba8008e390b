//! Helpers for addressing values inside a configuration tree.
//!
//! Paths are dotted (`database.credentials.user`) with optional sequence
//! indices (`servers[1].host`).

use crate::error::{BuddyError, BuddyResult};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// One step of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Split a dotted path into segments.
///
/// `a.b[2].c` becomes `[Key(a), Key(b), Index(2), Key(c)]`.
pub fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if key.is_empty() && rest.is_empty() {
            return None;
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let index = rest[1..close].trim().parse().ok()?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }
    Some(segments)
}

/// Look up a dotted path in `tree`.
pub fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    segments.iter().try_fold(tree, |node, segment| match segment {
        Segment::Key(key) => node.as_mapping()?.get(key.as_str()),
        Segment::Index(index) => node.as_sequence()?.get(*index),
    })
}

/// Render a mapping key for use inside a dotted path.
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => render_scalar(other),
    }
}

/// Render a scalar for display. Containers fall back to inline YAML.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => render_scalar(&tagged.value),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Read a YAML file into a tree. An empty document becomes an empty mapping.
pub fn load_yaml_file(path: &Path) -> BuddyResult<Value> {
    if !path.is_file() {
        return Err(BuddyError::config_not_found(path));
    }
    let content = std::fs::read_to_string(path).map_err(|e| BuddyError::io(path, e))?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| BuddyError::parse(path, e))?;
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Like [`load_yaml_file`], but a missing file is `Ok(None)`.
pub fn try_load_yaml_file(path: &Path) -> BuddyResult<Option<Value>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_yaml_file(path).map(Some)
}
