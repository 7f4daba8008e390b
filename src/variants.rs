//! Creating and removing named configuration variants.
//!
//! A variant `dev` consists of the root file `config_dev.yaml` plus a
//! `dev.yaml` next to every `default.yaml` in the group subdirectories.

use crate::config::tree::load_yaml_file;
use crate::config::{DEFAULT_LABEL, DEFAULT_ROOT, VARIANT_PREFIX};
use crate::error::{BuddyError, BuddyResult};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Key set to the variant name in a new root file.
pub const ENV_KEY: &str = "env";

/// Per-group file every new variant is copied from.
pub const GROUP_DEFAULT_FILE: &str = "default.yaml";

/// Root file preferred as the template for new variants.
pub const DEFAULT_VARIANT_FILE: &str = "config_default.yaml";

/// Result of [`add_config`].
#[derive(Debug, Clone)]
pub struct AddReport {
    pub config_file: PathBuf,
    /// Group files created from each `default.yaml`
    pub copied: Vec<PathBuf>,
}

/// Files that make up an existing variant.
#[derive(Debug, Clone)]
pub struct RemovePlan {
    pub config_file: PathBuf,
    pub group_files: Vec<PathBuf>,
}

impl RemovePlan {
    pub fn file_count(&self) -> usize {
        self.group_files.len() + 1
    }
}

/// Files deleted by [`remove_config`] and those that could not be.
#[derive(Debug, Clone, Default)]
pub struct RemoveReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone)]
pub enum RemoveOutcome {
    /// Confirmation was declined; nothing was touched.
    Cancelled,
    Removed(RemoveReport),
}

fn root_file(config_dir: &Path, name: &str) -> PathBuf {
    config_dir.join(format!("{}{}.yaml", VARIANT_PREFIX, name))
}

fn check_config_dir(config_dir: &Path) -> BuddyResult<()> {
    if !config_dir.is_dir() {
        return Err(BuddyError::validation(
            "No configuration directory found. Run 'buddy init' first.",
        )
        .with_path(config_dir));
    }
    Ok(())
}

fn check_name(name: &str) -> BuddyResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(BuddyError::validation(format!(
            "Invalid configuration name '{}'.",
            name
        )));
    }
    Ok(())
}

/// Subdirectories of `config_dir` (at any depth) in a stable order.
fn group_dirs(config_dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(config_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
}

/// `<group>/<name>.yaml` for every group directory holding a `default.yaml`.
///
/// These are the only group files a variant owns.
fn variant_group_files(config_dir: &Path, name: &str) -> Vec<PathBuf> {
    group_dirs(config_dir)
        .filter(|dir| dir.join(GROUP_DEFAULT_FILE).is_file())
        .map(|dir| dir.join(format!("{}.yaml", name)))
        .collect()
}

/// Check that `name` can be added and return the root file to copy from.
pub fn validate_add(config_dir: &Path, name: &str) -> BuddyResult<PathBuf> {
    check_config_dir(config_dir)?;
    check_name(name)?;

    if root_file(config_dir, name).exists() {
        return Err(BuddyError::validation(format!(
            "Configuration '{}' already exists.",
            name
        )));
    }
    if let Some(taken) = variant_group_files(config_dir, name)
        .into_iter()
        .find(|path| path.exists())
    {
        return Err(BuddyError::validation(format!(
            "Group file for '{}' already exists.",
            name
        ))
        .with_path(taken));
    }

    [DEFAULT_VARIANT_FILE.to_string(), format!("{}.yaml", DEFAULT_ROOT)]
        .iter()
        .map(|file| config_dir.join(file))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            BuddyError::validation(format!(
                "No {} or {}.yaml found.",
                DEFAULT_VARIANT_FILE, DEFAULT_ROOT
            ))
        })
}

/// Create variant `name` from the default configuration.
///
/// The new root file is a copy of the default root with `env` set to
/// `name`; every `default.yaml` below the root is copied to `<name>.yaml`.
pub fn add_config(config_dir: &Path, name: &str) -> BuddyResult<AddReport> {
    let source = validate_add(config_dir, name)?;

    let mut content = load_yaml_file(&source)?;
    let Value::Mapping(map) = &mut content else {
        return Err(BuddyError::validation(format!(
            "{} does not contain a mapping.",
            source.display()
        )));
    };
    map.insert(Value::from(ENV_KEY), Value::from(name));

    let config_file = root_file(config_dir, name);
    let rendered = serde_yaml::to_string(&content).map_err(BuddyError::internal)?;
    fs::write(&config_file, rendered).map_err(|e| BuddyError::io(&config_file, e))?;
    debug!(from = %source.display(), to = %config_file.display(), "Created root file");

    let mut copied = Vec::new();
    for target in variant_group_files(config_dir, name) {
        let default_file = target.with_file_name(GROUP_DEFAULT_FILE);
        fs::copy(&default_file, &target).map_err(|e| BuddyError::io(&target, e))?;
        copied.push(target);
    }

    info!(name = %name, copied = copied.len(), "Configuration added");
    Ok(AddReport {
        config_file,
        copied,
    })
}

/// Check that `name` can be removed and list the files it consists of.
pub fn plan_remove(config_dir: &Path, name: &str) -> BuddyResult<RemovePlan> {
    check_config_dir(config_dir)?;
    if name.eq_ignore_ascii_case(DEFAULT_LABEL) {
        return Err(BuddyError::validation(
            "Cannot remove the default configuration.",
        ));
    }
    check_name(name)?;

    let config_file = root_file(config_dir, name);
    if !config_file.is_file() {
        return Err(BuddyError::validation(format!(
            "Configuration '{}' does not exist.",
            name
        )));
    }

    let group_files = variant_group_files(config_dir, name)
        .into_iter()
        .filter(|path| path.is_file())
        .collect();

    Ok(RemovePlan {
        config_file,
        group_files,
    })
}

/// Remove variant `name` after `confirm` agrees.
///
/// The root file must be deletable; failures on group files are collected
/// in the report and do not stop the remaining deletions.
pub fn remove_config(
    config_dir: &Path,
    name: &str,
    confirm: impl FnOnce(&RemovePlan) -> bool,
) -> BuddyResult<RemoveOutcome> {
    let plan = plan_remove(config_dir, name)?;
    if !confirm(&plan) {
        debug!(name = %name, "Removal cancelled");
        return Ok(RemoveOutcome::Cancelled);
    }

    let mut report = RemoveReport::default();
    fs::remove_file(&plan.config_file).map_err(|e| BuddyError::io(&plan.config_file, e))?;
    report.removed.push(plan.config_file);

    for path in plan.group_files {
        match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove group file");
                report.failures.push((path, e.to_string()));
            }
        }
    }

    info!(name = %name, removed = report.removed.len(), failed = report.failures.len(), "Configuration removed");
    Ok(RemoveOutcome::Removed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("config.yaml"), "env: default\nproject:\n  name: demo\n").unwrap();
        fs::create_dir_all(dir.join("database")).unwrap();
        fs::write(dir.join("database/default.yaml"), "host: localhost\n").unwrap();
        temp
    }

    #[test]
    fn test_validate_add_prefers_config_default() {
        let temp = setup();
        let dir = temp.path();
        assert_eq!(validate_add(dir, "dev").unwrap(), dir.join("config.yaml"));
        fs::write(dir.join(DEFAULT_VARIANT_FILE), "env: default\n").unwrap();
        assert_eq!(
            validate_add(dir, "dev").unwrap(),
            dir.join(DEFAULT_VARIANT_FILE)
        );
    }

    #[test]
    fn test_add_without_directory() {
        let temp = TempDir::new().unwrap();
        let err = add_config(&temp.path().join("missing"), "dev").unwrap_err();
        assert!(err.is_validation());
        assert!(err.message.contains("buddy init"));
    }

    #[test]
    fn test_add_without_source_root() {
        let temp = TempDir::new().unwrap();
        let err = add_config(temp.path(), "dev").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let temp = setup();
        assert!(add_config(temp.path(), "../evil").unwrap_err().is_validation());
        assert!(add_config(temp.path(), "").unwrap_err().is_validation());
    }

    #[test]
    fn test_add_sets_env_in_place() {
        let temp = setup();
        let dir = temp.path();
        add_config(dir, "dev").unwrap();
        let content = fs::read_to_string(dir.join("config_dev.yaml")).unwrap();
        assert!(content.starts_with("env: dev"));
        assert!(content.contains("name: demo"));
    }

    #[test]
    fn test_remove_cancelled_touches_nothing() {
        let temp = setup();
        let dir = temp.path();
        add_config(dir, "dev").unwrap();
        let outcome = remove_config(dir, "dev", |plan| {
            assert_eq!(plan.file_count(), 2);
            false
        })
        .unwrap();
        assert!(matches!(outcome, RemoveOutcome::Cancelled));
        assert!(dir.join("config_dev.yaml").exists());
        assert!(dir.join("database/dev.yaml").exists());
    }

    #[test]
    fn test_add_refuses_existing_group_file() {
        let temp = setup();
        let dir = temp.path();
        fs::write(dir.join("database/prod.yaml"), "host: prod-db\n").unwrap();

        let err = add_config(dir, "prod").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.path.as_deref(), Some(dir.join("database/prod.yaml").as_path()));
        assert_eq!(
            fs::read_to_string(dir.join("database/prod.yaml")).unwrap(),
            "host: prod-db\n"
        );
        assert!(!dir.join("config_prod.yaml").exists());
    }

    #[test]
    fn test_remove_skips_groups_without_default() {
        let temp = setup();
        let dir = temp.path();
        fs::create_dir_all(dir.join("secrets")).unwrap();
        fs::write(dir.join("secrets/dev.yaml"), "token: t\n").unwrap();
        fs::write(dir.join("config_dev.yaml"), "env: dev\n").unwrap();

        let plan = plan_remove(dir, "dev").unwrap();
        assert!(plan.group_files.is_empty());
    }

    #[test]
    fn test_remove_missing_variant() {
        let temp = setup();
        let err = remove_config(temp.path(), "ghost", |_| true).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("does not exist"));
    }
}
