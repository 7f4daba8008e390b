//! Key listing attributed to the file each key came from.
//!
//! Walks a root configuration file and the files its `defaults` list names,
//! recording every dotted key that ends in a scalar or a list under a
//! *source label* describing how the file was reached:
//!
//! ```text
//! config -> project.name
//! config.database -> database.host
//! config.secrets.keys -> secrets.api.key
//! ```
//!
//! Only one level of nested defaults is followed below a bare-name entry.
//! Deeper chains are reported through [`KeyIndex::truncated`], and files
//! that cannot be found through [`KeyIndex::missing`]; neither stops the
//! listing.

use crate::config::compose::{DEFAULTS_KEY, DefaultsEntry};
use crate::config::display_name;
use crate::config::tree::{key_to_string, load_yaml_file, render_scalar, try_load_yaml_file};
use crate::error::BuddyResult;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A dotted key and, for scalar leaves, its rendered value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectedKey {
    pub path: String,
    pub value: Option<String>,
}

/// Keys grouped by source label.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    sources: BTreeMap<String, Vec<CollectedKey>>,
    /// Which file each source label was assigned to
    origins: BTreeMap<String, PathBuf>,
    missing: Vec<PathBuf>,
    truncated: Vec<PathBuf>,
}

impl KeyIndex {
    /// Record every leaf of `tree` under `source`, each path prefixed by `prefix`.
    ///
    /// Mapping-valued keys are not recorded themselves, only their
    /// descendants. Sequence keys are recorded, and mapping elements inside
    /// them are walked as `key[i].child`.
    pub fn collect(&mut self, tree: &Value, prefix: &str, source: &str) {
        let Value::Mapping(map) = tree else {
            return;
        };
        self.sources.entry(source.to_string()).or_default();

        for (key, value) in map {
            let full_key = format!("{}{}", prefix, key_to_string(key));
            match value {
                Value::Mapping(_) => self.collect(value, &format!("{}.", full_key), source),
                Value::Sequence(items) => {
                    self.record(source, &full_key, None);
                    for (i, item) in items.iter().enumerate() {
                        if item.is_mapping() {
                            self.collect(item, &format!("{}[{}].", full_key, i), source);
                        }
                    }
                }
                scalar => self.record(source, &full_key, Some(render_scalar(scalar))),
            }
        }
    }

    fn record(&mut self, source: &str, path: &str, value: Option<String>) {
        self.sources
            .entry(source.to_string())
            .or_default()
            .push(CollectedKey {
                path: path.to_string(),
                value,
            });
    }

    /// Reserve `label` for `origin`, picking a distinct label if another
    /// file already holds it.
    fn claim_source(&mut self, label: String, origin: &Path) -> String {
        let mut candidate = label.clone();
        let mut attempt = 1;
        loop {
            match self.origins.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(origin.to_path_buf());
                    return candidate;
                }
                Entry::Occupied(slot) if slot.get() == origin => return candidate,
                Entry::Occupied(_) => {
                    attempt += 1;
                    candidate = match origin.file_stem() {
                        Some(stem) if attempt == 2 => {
                            format!("{}.{}", label, stem.to_string_lossy())
                        }
                        _ => format!("{}#{}", label, attempt),
                    };
                }
            }
        }
    }

    pub fn sources(&self) -> &BTreeMap<String, Vec<CollectedKey>> {
        &self.sources
    }

    /// Keys recorded for `source`, in collection order.
    pub fn keys(&self, source: &str) -> Option<&[CollectedKey]> {
        self.sources.get(source).map(Vec::as_slice)
    }

    /// Referenced files that did not exist.
    pub fn missing(&self) -> &[PathBuf] {
        &self.missing
    }

    /// Files whose own `defaults` list was not followed.
    pub fn truncated(&self) -> &[PathBuf] {
        &self.truncated
    }

    pub fn is_empty(&self) -> bool {
        self.sources.values().all(Vec::is_empty)
    }

    /// `source -> key` lines, sorted by source then key.
    ///
    /// With `with_values`, scalar leaves are shown as `source -> key = value`.
    pub fn lines(&self, with_values: bool) -> Vec<String> {
        let mut lines = Vec::new();
        for (source, keys) in &self.sources {
            let mut keys = keys.clone();
            keys.sort();
            keys.dedup();
            for key in keys {
                match (&key.value, with_values) {
                    (Some(value), true) => {
                        lines.push(format!("{} -> {} = {}", source, key.path, value))
                    }
                    _ => lines.push(format!("{} -> {}", source, key.path)),
                }
            }
        }
        lines
    }
}

/// Every leaf of an already composed tree under a single `source` label.
pub fn collect_full(tree: &Value, source: &str) -> KeyIndex {
    let mut index = KeyIndex::default();
    index.collect(tree, "", source);
    index
}

/// Top-level keys of `tree`; with `with_values`, scalars show as `key = value`.
pub fn top_level_lines(tree: &Value, with_values: bool) -> Vec<String> {
    let Value::Mapping(map) = tree else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| match (with_values, value) {
            (true, Value::Mapping(_) | Value::Sequence(_)) | (false, _) => key_to_string(key),
            (true, scalar) => format!("{} = {}", key_to_string(key), render_scalar(scalar)),
        })
        .collect()
}

/// Load `<config_dir>/<root_name>.yaml` and build its structured key index.
pub fn collect_for_variant(config_dir: &Path, root_name: &str) -> BuddyResult<KeyIndex> {
    let root_path = config_dir.join(format!("{}.yaml", root_name));
    let tree = load_yaml_file(&root_path)?;
    debug!(path = %root_path.display(), "Collecting keys along the defaults chain");
    collect_structured(&tree, config_dir, root_name)
}

/// Build the structured key index for a root configuration file.
///
/// `tree` is the root file's own content (not composed), read from
/// `<config_dir>/<root_name>.yaml`. The root source label is `config` for
/// the default variant and the bare variant name otherwise.
pub fn collect_structured(tree: &Value, config_dir: &Path, root_name: &str) -> BuddyResult<KeyIndex> {
    let mut collector = KeyCollector {
        config_dir,
        index: KeyIndex::default(),
    };
    let root_path = config_dir.join(format!("{}.yaml", root_name));
    let root_label = collector
        .index
        .claim_source(display_name(root_name).to_string(), &root_path);
    collector.index.collect(tree, "", &root_label);

    for entry in defaults_entries(tree, &root_path) {
        match entry {
            DefaultsEntry::SelfRef | DefaultsEntry::Unset { .. } => {}
            DefaultsEntry::Name(name) => {
                if let Some((group, option)) = name.rsplit_once('/') {
                    let label = format!("{}.{}", root_label, name.replace('/', "."));
                    collector.collect_group_file(group, option, label)?;
                    continue;
                }
                let path = config_dir.join(format!("{}.yaml", name));
                if let Some(sub) = collector.load(&path)? {
                    let source = collector
                        .index
                        .claim_source(format!("{}.{}", root_label, name), &path);
                    collector.index.collect(&sub, "", &source);
                    collector.follow_nested(&sub, &source, &path)?;
                }
            }
            DefaultsEntry::Group { group, option } => {
                let label = format!("{}.{}", root_label, group);
                collector.collect_group_file(&group, &option, label)?;
            }
            DefaultsEntry::GroupList { group, options } => {
                for option in options {
                    let label = format!("{}.{}.{}", root_label, group, option);
                    collector.collect_group_file(&group, &option, label)?;
                }
            }
        }
    }
    Ok(collector.index)
}

struct KeyCollector<'a> {
    config_dir: &'a Path,
    index: KeyIndex,
}

impl KeyCollector<'_> {
    fn load(&mut self, path: &Path) -> BuddyResult<Option<Value>> {
        let loaded = try_load_yaml_file(path)?;
        match &loaded {
            Some(_) => debug!(path = %path.display(), "Loaded referenced configuration"),
            None => {
                warn!(path = %path.display(), "Referenced configuration not found, skipping");
                self.index.missing.push(path.to_path_buf());
            }
        }
        Ok(loaded)
    }

    /// Collect `<group>/<option>.yaml` with every key under `<group>.`.
    ///
    /// Nested groups (`a/b`) prefix keys with `a.b.`, the way composition
    /// wraps them.
    fn collect_group_file(&mut self, group: &str, option: &str, label: String) -> BuddyResult<()> {
        let path = self.config_dir.join(group).join(format!("{}.yaml", option));
        if let Some(sub) = self.load(&path)? {
            let source = self.index.claim_source(label, &path);
            self.index.collect(&sub, &format!("{}.", group.replace('/', ".")), &source);
            self.flag_unfollowed(&sub, &path);
        }
        Ok(())
    }

    /// Resolve the `defaults` of a file reached by bare name, one level only.
    fn follow_nested(&mut self, tree: &Value, source: &str, origin: &Path) -> BuddyResult<()> {
        for entry in defaults_entries(tree, origin) {
            match entry {
                DefaultsEntry::SelfRef | DefaultsEntry::Unset { .. } => {}
                DefaultsEntry::Name(name) => {
                    if let Some((group, option)) = name.rsplit_once('/') {
                        let label = format!("{}.{}", source, name.replace('/', "."));
                        self.collect_group_file(group, option, label)?;
                        continue;
                    }
                    let path = self.config_dir.join(format!("{}.yaml", name));
                    if let Some(sub) = self.load(&path)? {
                        let stem = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().to_string())
                            .unwrap_or(name);
                        let label = self.index.claim_source(format!("{}.{}", source, stem), &path);
                        self.index.collect(&sub, "", &label);
                        self.flag_unfollowed(&sub, &path);
                    }
                }
                DefaultsEntry::Group { group, option } => {
                    self.collect_group_file(&group, &option, format!("{}.{}", source, group))?;
                }
                DefaultsEntry::GroupList { group, options } => {
                    for option in options {
                        let label = format!("{}.{}.{}", source, group, option);
                        self.collect_group_file(&group, &option, label)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn flag_unfollowed(&mut self, tree: &Value, path: &Path) {
        let has_defaults = tree
            .get(DEFAULTS_KEY)
            .and_then(Value::as_sequence)
            .is_some_and(|items| !items.is_empty());
        if has_defaults {
            warn!(
                path = %path.display(),
                "Nested defaults list not followed; keys from deeper files are not listed"
            );
            self.index.truncated.push(path.to_path_buf());
        }
    }
}

/// Parse a file's defaults list, skipping malformed entries with a warning.
fn defaults_entries(tree: &Value, origin: &Path) -> Vec<DefaultsEntry> {
    let Some(Value::Sequence(items)) = tree.get(DEFAULTS_KEY) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match DefaultsEntry::parse(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %origin.display(), error = %e, "Ignoring defaults entry");
                None
            }
        })
        .collect()
}
