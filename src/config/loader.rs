//! Locating the configuration directory and naming configuration variants.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name of a configuration set.
pub const CONFIG_DIR_NAME: &str = ".hydra-conf";

/// Package-local location checked before searching upward.
pub const PACKAGE_DIR_NAME: &str = "hydra_buddies";

/// Environment variable overriding the configuration directory.
pub const CONFIG_PATH_ENV: &str = "HYDRA_CONFIG_PATH";

/// File stem of the default variant's root file.
pub const DEFAULT_ROOT: &str = "config";

/// Label reserved for the default variant.
pub const DEFAULT_LABEL: &str = "default";

/// Prefix of every non-default variant's root file.
pub const VARIANT_PREFIX: &str = "config_";

/// How the configuration directory was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// `--path` on the command line
    Explicit,
    /// `HYDRA_CONFIG_PATH`
    Environment,
    /// `./hydra_buddies/.hydra-conf`
    Package,
    /// Nearest `.hydra-conf` in the current directory or above
    Ancestor,
    /// Nothing found; `./.hydra-conf` is assumed
    Fallback,
}

impl std::fmt::Display for PathSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSource::Explicit => write!(f, "--path"),
            PathSource::Environment => write!(f, "{}", CONFIG_PATH_ENV),
            PathSource::Package => write!(f, "package"),
            PathSource::Ancestor => write!(f, "ancestor"),
            PathSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// The configuration directory in use and where it came from.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub source: PathSource,
}

impl ConfigPaths {
    /// Discover the configuration directory from the process environment.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let env = std::env::var(CONFIG_PATH_ENV).ok();
        Self::discover_from(explicit, env.as_deref(), &cwd)
    }

    /// Discovery with every input supplied by the caller.
    pub fn discover_from(explicit: Option<&Path>, env: Option<&str>, cwd: &Path) -> Self {
        let found = if let Some(path) = explicit {
            Self::new(path, PathSource::Explicit)
        } else if let Some(path) = env.filter(|p| !p.is_empty()) {
            Self::new(path, PathSource::Environment)
        } else {
            let package_dir = cwd.join(PACKAGE_DIR_NAME).join(CONFIG_DIR_NAME);
            if package_dir.is_dir() {
                Self::new(package_dir, PathSource::Package)
            } else if let Some(dir) = find_upward(cwd) {
                Self::new(dir, PathSource::Ancestor)
            } else {
                Self::new(cwd.join(CONFIG_DIR_NAME), PathSource::Fallback)
            }
        };
        debug!(path = %found.config_dir.display(), source = %found.source, "Using configuration directory");
        found
    }

    /// The `.hydra-conf` directory directly under the current directory.
    pub fn local() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(cwd.join(CONFIG_DIR_NAME), PathSource::Fallback)
    }

    fn new(path: impl Into<PathBuf>, source: PathSource) -> Self {
        Self {
            config_dir: path.into(),
            source,
        }
    }
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Root file stem for a user-supplied variant name.
///
/// `default` and `config` map to `config`; anything else gets the
/// `config_` prefix unless it already carries it.
pub fn normalize_config_name(name: &str) -> String {
    match name {
        DEFAULT_LABEL | DEFAULT_ROOT => DEFAULT_ROOT.to_string(),
        prefixed if prefixed.starts_with(VARIANT_PREFIX) => prefixed.to_string(),
        bare => format!("{}{}", VARIANT_PREFIX, bare),
    }
}

/// Label used for a root file in listings: `config` or the bare variant name.
pub fn display_name(root_name: &str) -> &str {
    root_name.strip_prefix(VARIANT_PREFIX).unwrap_or(root_name)
}
