//! Composition of a root configuration file with its defaults list.
//!
//! A root file such as `config.yaml` names the files it is built from:
//!
//! ```yaml
//! defaults:
//!   - _self_
//!   - database: default      # database/default.yaml under `database`
//!   - secrets: [keys, login] # both files under `secrets`
//!   - secrets/extra          # secrets/extra.yaml under `secrets`
//!   - common                 # common.yaml merged at the current level
//! ```
//!
//! Entries are merged in order, later ones overriding earlier ones. `_self_`
//! marks where the file's own body goes; without it the body is merged last.
//!
//! All state lives in an explicit [`ResolutionContext`] created per call, so
//! nothing needs to be reset between compositions.

use super::merge::{deep_merge_all, promote_secrets};
use super::tree::load_yaml_file;
use super::interpolate;
use crate::error::{BuddyError, BuddyResult};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key holding the defaults list in a configuration file.
pub const DEFAULTS_KEY: &str = "defaults";

/// Defaults entry marking the position of the file's own body.
pub const SELF_ENTRY: &str = "_self_";

/// Maximum nesting of defaults lists before composition gives up.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// One entry of a `defaults` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultsEntry {
    /// `_self_`
    SelfRef,
    /// `name` or `group/option`
    Name(String),
    /// `group: option`
    Group { group: String, option: String },
    /// `group: [option, ...]`
    GroupList { group: String, options: Vec<String> },
    /// `group: null`
    Unset { group: String },
}

impl DefaultsEntry {
    /// Parse a single list element.
    pub fn parse(value: &Value) -> BuddyResult<Self> {
        match value {
            Value::String(s) if s == SELF_ENTRY => Ok(Self::SelfRef),
            Value::String(s) => Ok(Self::Name(s.clone())),
            Value::Mapping(map) if map.len() == 1 => {
                let Some((key, option)) = map.iter().next() else {
                    return Err(invalid_entry(value, "empty group mapping"));
                };
                let group = key
                    .as_str()
                    .ok_or_else(|| invalid_entry(value, "group name must be a string"))?
                    .to_string();
                match option {
                    Value::String(option) => Ok(Self::Group {
                        group,
                        option: option.clone(),
                    }),
                    Value::Sequence(items) => {
                        let options = items
                            .iter()
                            .map(|item| {
                                item.as_str()
                                    .map(str::to_string)
                                    .ok_or_else(|| invalid_entry(value, "options must be strings"))
                            })
                            .collect::<BuddyResult<Vec<_>>>()?;
                        Ok(Self::GroupList { group, options })
                    }
                    Value::Null => Ok(Self::Unset { group }),
                    _ => Err(invalid_entry(value, "option must be a string or a list")),
                }
            }
            _ => Err(invalid_entry(
                value,
                "expected a name or a single-key group mapping",
            )),
        }
    }

    /// Parse the `defaults` list of `tree`. A tree without one has no entries.
    pub fn parse_list(tree: &Value) -> BuddyResult<Vec<Self>> {
        match tree.get(DEFAULTS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(items)) => items.iter().map(Self::parse).collect(),
            Some(_) => Err(BuddyError::composition("'defaults' must be a list")),
        }
    }
}

fn invalid_entry(value: &Value, reason: &str) -> BuddyError {
    let rendered = serde_yaml::to_string(value).unwrap_or_default();
    BuddyError::composition(format!("Invalid defaults entry: {}", reason))
        .with_details(rendered.trim().to_string())
}

/// Explicit state for one composition run.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    config_dir: PathBuf,
    max_depth: usize,
}

impl ResolutionContext {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Compose `<config_dir>/<root_name>.yaml` with its defaults chain.
    ///
    /// Interpolations are left untouched; see [`ResolutionContext::resolve`].
    pub fn compose(&self, root_name: &str) -> BuddyResult<Value> {
        let root_path = self.config_dir.join(format!("{}.yaml", root_name));
        debug!(path = %root_path.display(), "Composing configuration");
        let mut stack = Vec::new();
        self.expand(&root_path, "", &mut stack)
    }

    /// Compose, promote secrets, and resolve all interpolations.
    pub fn resolve(&self, root_name: &str) -> BuddyResult<Value> {
        let composed = self.compose(root_name)?;
        resolve_tree(&composed)
    }

    fn expand(&self, path: &Path, group_dir: &str, stack: &mut Vec<PathBuf>) -> BuddyResult<Value> {
        if stack.iter().any(|seen| seen == path) {
            let chain: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            return Err(BuddyError::composition("Defaults cycle detected")
                .with_path(path)
                .with_details(chain.join(" -> ")));
        }
        if stack.len() >= self.max_depth {
            return Err(BuddyError::composition(format!(
                "Defaults nested deeper than {} levels",
                self.max_depth
            ))
            .with_path(path));
        }

        let tree = load_yaml_file(path)?;
        let entries = DefaultsEntry::parse_list(&tree).map_err(|e| e.with_path(path))?;
        let body = strip_defaults(tree);

        stack.push(path.to_path_buf());
        let mut layers = Vec::with_capacity(entries.len() + 1);
        let mut self_placed = false;

        for entry in entries {
            match entry {
                DefaultsEntry::SelfRef => {
                    layers.push(body.clone());
                    self_placed = true;
                }
                DefaultsEntry::Name(name) => match name.rsplit_once('/') {
                    Some((group, option)) => {
                        layers.push(self.expand_group(group_dir, group, option, stack)?);
                    }
                    None => {
                        let (child, child_group) = self.locate(group_dir, &name)?;
                        layers.push(self.expand(&child, &child_group, stack)?);
                    }
                },
                DefaultsEntry::Group { group, option } => {
                    layers.push(self.expand_group(group_dir, &group, &option, stack)?);
                }
                DefaultsEntry::GroupList { group, options } => {
                    for option in options {
                        layers.push(self.expand_group(group_dir, &group, &option, stack)?);
                    }
                }
                DefaultsEntry::Unset { group } => {
                    debug!(group = %group, "Skipping unset defaults group");
                }
            }
        }
        if !self_placed {
            layers.push(body);
        }
        stack.pop();

        Ok(match deep_merge_all(layers) {
            Value::Null => Value::Mapping(Mapping::new()),
            merged => merged,
        })
    }

    fn expand_group(
        &self,
        group_dir: &str,
        group: &str,
        option: &str,
        stack: &mut Vec<PathBuf>,
    ) -> BuddyResult<Value> {
        let (path, child_group) = self.locate(group_dir, &format!("{}/{}", group, option))?;
        debug!(group = %group, option = %option, path = %path.display(), "Loading group option");
        let content = self.expand(&path, &child_group, stack)?;
        Ok(wrap_in_package(group, content))
    }

    /// Find `<rel>.yaml`, first relative to the current group directory and
    /// then relative to the configuration root.
    fn locate(&self, group_dir: &str, rel: &str) -> BuddyResult<(PathBuf, String)> {
        let file = format!("{}.yaml", rel);
        let mut candidates = Vec::with_capacity(2);
        if !group_dir.is_empty() {
            candidates.push(self.config_dir.join(group_dir).join(&file));
        }
        candidates.push(self.config_dir.join(&file));

        for candidate in &candidates {
            if candidate.is_file() {
                let child_group = candidate
                    .parent()
                    .and_then(|p| p.strip_prefix(&self.config_dir).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                return Ok((candidate.clone(), child_group));
            }
        }
        Err(BuddyError::config_not_found(&candidates[0]))
    }
}

/// Promote secrets and resolve interpolations in an already composed tree.
pub fn resolve_tree(composed: &Value) -> BuddyResult<Value> {
    let mut promoted = composed.clone();
    promote_secrets(&mut promoted);
    interpolate::resolve(&promoted)
}

/// Remove the `defaults` key, keeping the order of everything else.
pub fn strip_defaults(tree: Value) -> Value {
    match tree {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .filter(|(key, _)| key.as_str() != Some(DEFAULTS_KEY))
                .collect(),
        ),
        other => other,
    }
}

/// Nest `value` under a package path such as `db` or `secrets/keys`.
pub fn wrap_in_package(package: &str, value: Value) -> Value {
    package
        .split(['/', '.'])
        .filter(|segment| !segment.is_empty())
        .rev()
        .fold(value, |inner, segment| {
            let mut map = Mapping::new();
            map.insert(Value::String(segment.to_string()), inner);
            Value::Mapping(map)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::TempDir;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_entries() {
        assert_eq!(
            DefaultsEntry::parse(&yaml("_self_")).unwrap(),
            DefaultsEntry::SelfRef
        );
        assert_eq!(
            DefaultsEntry::parse(&yaml("secrets/keys")).unwrap(),
            DefaultsEntry::Name("secrets/keys".into())
        );
        assert_eq!(
            DefaultsEntry::parse(&yaml("database: default")).unwrap(),
            DefaultsEntry::Group {
                group: "database".into(),
                option: "default".into()
            }
        );
        assert_eq!(
            DefaultsEntry::parse(&yaml("secrets: [keys, login]")).unwrap(),
            DefaultsEntry::GroupList {
                group: "secrets".into(),
                options: vec!["keys".into(), "login".into()]
            }
        );
        assert_eq!(
            DefaultsEntry::parse(&yaml("cache: null")).unwrap(),
            DefaultsEntry::Unset {
                group: "cache".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(DefaultsEntry::parse(&yaml("{a: x, b: y}")).is_err());
        assert!(DefaultsEntry::parse(&yaml("a: 3")).is_err());
        assert!(DefaultsEntry::parse(&yaml("a: [1, 2]")).is_err());
        assert!(DefaultsEntry::parse(&yaml("42")).is_err());
        assert!(DefaultsEntry::parse_list(&yaml("defaults: nope")).is_err());
        assert!(DefaultsEntry::parse_list(&yaml("x: 1")).unwrap().is_empty());
    }

    #[test]
    fn test_compose_groups_and_self() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(
            dir,
            "config.yaml",
            "defaults:\n  - _self_\n  - database: default\n  - secrets/keys\nproject:\n  name: demo\n",
        );
        write(dir, "database/default.yaml", "host: localhost\nport: 5432\n");
        write(dir, "secrets/keys.yaml", "api:\n  key: abc\n");

        let composed = ResolutionContext::new(dir).compose("config").unwrap();
        assert!(composed.get(DEFAULTS_KEY).is_none());
        assert_eq!(composed["project"]["name"].as_str(), Some("demo"));
        assert_eq!(composed["database"]["port"].as_u64(), Some(5432));
        assert_eq!(composed["secrets"]["api"]["key"].as_str(), Some("abc"));
    }

    #[test]
    fn test_self_last_by_default_wins() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(
            dir,
            "config.yaml",
            "defaults:\n  - database: default\ndatabase:\n  port: 6543\n",
        );
        write(dir, "database/default.yaml", "host: localhost\nport: 5432\n");

        let composed = ResolutionContext::new(dir).compose("config").unwrap();
        assert_eq!(composed["database"]["port"].as_u64(), Some(6543));
        assert_eq!(composed["database"]["host"].as_str(), Some("localhost"));
    }

    #[test]
    fn test_self_first_is_overridden() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(
            dir,
            "config.yaml",
            "defaults:\n  - _self_\n  - database: default\ndatabase:\n  port: 6543\n",
        );
        write(dir, "database/default.yaml", "port: 5432\n");

        let composed = ResolutionContext::new(dir).compose("config").unwrap();
        assert_eq!(composed["database"]["port"].as_u64(), Some(5432));
    }

    #[test]
    fn test_group_list_merges_in_order() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(dir, "config.yaml", "defaults:\n  - secrets: [keys, login]\n");
        write(dir, "secrets/keys.yaml", "shared: keys\napi: {key: k}\n");
        write(dir, "secrets/login.yaml", "shared: login\ndb: {user: u}\n");

        let composed = ResolutionContext::new(dir).compose("config").unwrap();
        assert_eq!(composed["secrets"]["shared"].as_str(), Some("login"));
        assert_eq!(composed["secrets"]["api"]["key"].as_str(), Some("k"));
        assert_eq!(composed["secrets"]["db"]["user"].as_str(), Some("u"));
    }

    #[test]
    fn test_nested_defaults_are_group_relative() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(dir, "config.yaml", "defaults:\n  - database: prod\n");
        write(
            dir,
            "database/prod.yaml",
            "defaults:\n  - base\nhost: prod.example.com\n",
        );
        write(dir, "database/base.yaml", "host: localhost\nport: 5432\n");

        let composed = ResolutionContext::new(dir).compose("config").unwrap();
        assert_eq!(composed["database"]["host"].as_str(), Some("prod.example.com"));
        assert_eq!(composed["database"]["port"].as_u64(), Some(5432));
    }

    #[test]
    fn test_missing_reference_is_load_error() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(dir, "config.yaml", "defaults:\n  - database: nope\n");

        let err = ResolutionContext::new(dir).compose("config").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
        assert!(err.path.unwrap().ends_with("database/nope.yaml"));
    }

    #[test]
    fn test_missing_root_is_load_error() {
        let temp = TempDir::new().unwrap();
        let err = ResolutionContext::new(temp.path()).compose("config_dev").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_cycle_detected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(dir, "config.yaml", "defaults:\n  - other\n");
        write(dir, "other.yaml", "defaults:\n  - config\n");

        let err = ResolutionContext::new(dir).compose("config").unwrap_err();
        assert_eq!(err.code, ErrorCode::CompositionFailed);
        assert!(err.details.unwrap().contains("other.yaml"));
    }

    #[test]
    fn test_max_depth() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(dir, "config.yaml", "defaults:\n  - a\n");
        write(dir, "a.yaml", "defaults:\n  - b\n");
        write(dir, "b.yaml", "x: 1\n");

        let ctx = ResolutionContext::new(dir).with_max_depth(2);
        let err = ctx.compose("config").unwrap_err();
        assert_eq!(err.code, ErrorCode::CompositionFailed);
        assert!(ResolutionContext::new(dir).compose("config").is_ok());
    }

    #[test]
    fn test_resolve_promotes_secrets_before_interpolation() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write(
            dir,
            "config.yaml",
            "defaults:\n  - secrets/login\n  - _self_\nurl: 'postgres://${login.user}@db'\n",
        );
        write(dir, "secrets/login.yaml", "login:\n  user: admin\n");

        let resolved = ResolutionContext::new(dir).resolve("config").unwrap();
        assert_eq!(resolved["url"].as_str(), Some("postgres://admin@db"));
        assert_eq!(resolved["login"]["user"].as_str(), Some("admin"));
    }

    #[test]
    fn test_wrap_in_package() {
        assert_eq!(wrap_in_package("a/b", yaml("x: 1")), yaml("a: {b: {x: 1}}"));
        assert_eq!(wrap_in_package("", yaml("x: 1")), yaml("x: 1"));
    }
}
