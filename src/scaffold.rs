//! `buddy init`: write a starter `.hydra-conf` into a project.
//!
//! Templates are embedded at compile time using `include_str!`.

use crate::config::CONFIG_DIR_NAME;
use crate::error::{BuddyError, BuddyResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Placeholder replaced with the project directory name.
pub const PROJECT_NAME_PLACEHOLDER: &str = "{{ project_name }}";

/// Line keeping secrets out of version control.
pub const GITIGNORE_SECRETS_LINE: &str = ".hydra-conf/secrets/*";

/// Template files as (path below `.hydra-conf`, content).
pub const TEMPLATES: &[(&str, &str)] = &[
    (
        "config.yaml",
        include_str!("../templates/hydra_conf/config.yaml"),
    ),
    (
        "database/default.yaml",
        include_str!("../templates/hydra_conf/database/default.yaml"),
    ),
    (
        "api/default.yaml",
        include_str!("../templates/hydra_conf/api/default.yaml"),
    ),
    (
        "secrets/keys.yaml",
        include_str!("../templates/hydra_conf/secrets/keys.yaml"),
    ),
    (
        "secrets/login.yaml",
        include_str!("../templates/hydra_conf/secrets/login.yaml"),
    ),
];

/// Create `<project_dir>/.hydra-conf` from the templates and make sure the
/// secrets directory is git-ignored.
///
/// Returns the configuration files written, in template order.
pub fn init(project_dir: &Path) -> BuddyResult<Vec<PathBuf>> {
    let config_dir = project_dir.join(CONFIG_DIR_NAME);
    if config_dir.exists() {
        return Err(
            BuddyError::validation("A configuration directory already exists.")
                .with_path(&config_dir),
        );
    }

    let project_name = project_name(project_dir);
    let mut written = Vec::with_capacity(TEMPLATES.len());
    for (relative, template) in TEMPLATES {
        let path = config_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuddyError::io(parent, e))?;
        }
        let content = template.replace(PROJECT_NAME_PLACEHOLDER, &project_name);
        fs::write(&path, content).map_err(|e| BuddyError::io(&path, e))?;
        debug!(path = %path.display(), "Wrote template");
        written.push(path);
    }

    ensure_gitignored(project_dir)?;
    info!(dir = %config_dir.display(), "Configuration directory initialized");
    Ok(written)
}

fn project_name(project_dir: &Path) -> String {
    let absolute = fs::canonicalize(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

/// Append the secrets line to `.gitignore` unless it is already there.
///
/// Returns true when the file was changed.
pub fn ensure_gitignored(project_dir: &Path) -> BuddyResult<bool> {
    let path = project_dir.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(BuddyError::io(&path, e)),
    };

    if existing.lines().any(|line| line.trim() == GITIGNORE_SECRETS_LINE) {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(GITIGNORE_SECRETS_LINE);
    updated.push('\n');
    fs::write(&path, updated).map_err(|e| BuddyError::io(&path, e))?;
    debug!(path = %path.display(), "Updated .gitignore");
    Ok(true)
}
