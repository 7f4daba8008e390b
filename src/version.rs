//! Project version management behind the `upversion` binary.
//!
//! The version lives in `pyproject.toml` (`tool.poetry.version` or
//! `project.version`) or `Cargo.toml` (`package.version`). Updates are
//! applied as text edits so comments and layout survive.

use regex_lite::{NoExpand, Regex};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const PYPROJECT_FILE: &str = "pyproject.toml";
pub const CARGO_FILE: &str = "Cargo.toml";

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("Version must be in X.Y.Z format (e.g. 1.2.3), got '{0}'")]
    Malformed(String),

    #[error("No {} or {} found in {}", PYPROJECT_FILE, CARGO_FILE, .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No version field in {}", .0.display())]
    MissingVersion(PathBuf),

    #[error("No version line under [{table}] in {}", .path.display())]
    VersionLineNotFound { path: PathBuf, table: String },

    #[error("Cannot bump {component} of {version}: value out of range")]
    Overflow {
        version: Version,
        component: VersionComponent,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// A strict `MAJOR.MINOR.PATCH` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Increment `component`, zeroing the components below it.
    pub fn bump(self, component: VersionComponent) -> Result<Self, VersionError> {
        let overflow = || VersionError::Overflow {
            version: self,
            component,
        };
        let next = |n: u64| n.checked_add(1).ok_or_else(overflow);
        Ok(match component {
            VersionComponent::Major => Self::new(next(self.major)?, 0, 0),
            VersionComponent::Minor => Self::new(self.major, next(self.minor)?, 0),
            VersionComponent::Patch => Self::new(self.major, self.minor, next(self.patch)?),
        })
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::Malformed(s.to_string());
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(malformed());
        };
        let number = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse::<u64>().map_err(|_| malformed())
        };
        Ok(Self::new(number(major)?, number(minor)?, number(patch)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionComponent::Major => write!(f, "major"),
            VersionComponent::Minor => write!(f, "minor"),
            VersionComponent::Patch => write!(f, "patch"),
        }
    }
}

/// Nearest directory at or above `start` holding a manifest, else `start`.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(PYPROJECT_FILE).is_file() || dir.join(CARGO_FILE).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Pyproject,
    Cargo,
}

/// A parsed manifest and where its version is declared.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub kind: ManifestKind,
    /// Dotted name of the table holding `version`
    pub table: String,
    pub package_name: Option<String>,
    pub version: Version,
    content: String,
}

impl Manifest {
    /// Load the manifest in `root`, preferring `pyproject.toml`.
    pub fn load(root: &Path) -> Result<Self, VersionError> {
        let (path, kind) = [
            (root.join(PYPROJECT_FILE), ManifestKind::Pyproject),
            (root.join(CARGO_FILE), ManifestKind::Cargo),
        ]
        .into_iter()
        .find(|(path, _)| path.is_file())
        .ok_or_else(|| VersionError::ManifestNotFound(root.to_path_buf()))?;

        let content = fs::read_to_string(&path).map_err(|source| VersionError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed: toml::Table = toml::from_str(&content).map_err(|source| VersionError::Parse {
            path: path.clone(),
            source,
        })?;

        let candidates: &[&[&str]] = match kind {
            ManifestKind::Pyproject => &[&["tool", "poetry"], &["project"]],
            ManifestKind::Cargo => &[&["package"]],
        };
        let (table_path, table) = candidates
            .iter()
            .find_map(|keys| {
                let table = lookup_table(&parsed, keys)?;
                table.get("version")?.as_str()?;
                Some((*keys, table))
            })
            .ok_or_else(|| VersionError::MissingVersion(path.clone()))?;

        let raw = table
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VersionError::MissingVersion(path.clone()))?;
        let version: Version = raw.parse()?;
        let package_name = table
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        debug!(path = %path.display(), version = %version, "Loaded manifest");
        Ok(Self {
            path,
            kind,
            table: table_path.join("."),
            package_name,
            version,
            content,
        })
    }

    /// Manifest text with the version line replaced.
    pub fn render_with(&self, version: &Version) -> Result<String, VersionError> {
        let line = Regex::new(r#"^(\s*version\s*=\s*)["'][^"']*["']"#)?;
        let mut current_table = String::new();
        let mut replaced = false;
        let mut out = String::with_capacity(self.content.len());

        for raw in self.content.split_inclusive('\n') {
            let trimmed = raw.trim();
            if let Some(header) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.split(']').next())
            {
                current_table = header.trim().to_string();
            }
            if !replaced && current_table == self.table {
                if let Some(caps) = line.captures(raw) {
                    let prefix = caps.get(1).map_or("", |m| m.as_str());
                    let end = caps.get(0).map_or(0, |m| m.end());
                    out.push_str(&format!("{}\"{}\"", prefix, version));
                    out.push_str(&raw[end..]);
                    replaced = true;
                    continue;
                }
            }
            out.push_str(raw);
        }

        if !replaced {
            return Err(VersionError::VersionLineNotFound {
                path: self.path.clone(),
                table: self.table.clone(),
            });
        }
        Ok(out)
    }

    /// `<pkg>/__init__.py` for Python projects.
    pub fn init_file(&self) -> Option<PathBuf> {
        if self.kind != ManifestKind::Pyproject {
            return None;
        }
        let name = self.package_name.as_ref()?.replace('-', "_");
        let root = self.path.parent()?;
        Some(root.join(name).join("__init__.py"))
    }

    /// Write `version` to the manifest and any `__version__` declaration.
    ///
    /// Returns the files changed.
    pub fn write_version(&self, version: &Version) -> Result<Vec<PathBuf>, VersionError> {
        let rendered = self.render_with(version)?;
        fs::write(&self.path, rendered).map_err(|source| VersionError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut changed = vec![self.path.clone()];

        if let Some(init_file) = self.init_file().filter(|p| p.is_file()) {
            let content = fs::read_to_string(&init_file).map_err(|source| VersionError::Io {
                path: init_file.clone(),
                source,
            })?;
            let pattern = Regex::new(r#"__version__\s*=\s*["'][^"']*["']"#)?;
            let replacement = format!("__version__ = \"{}\"", version);
            let updated = pattern.replace_all(&content, NoExpand(&replacement));
            fs::write(&init_file, updated.as_ref()).map_err(|source| VersionError::Io {
                path: init_file.clone(),
                source,
            })?;
            changed.push(init_file);
        }

        debug!(version = %version, files = changed.len(), "Version written");
        Ok(changed)
    }
}

/// What [`apply_update`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    DryRun,
    Cancelled,
    Applied(Vec<PathBuf>),
}

/// Move `manifest` to `new_version` unless this is a dry run or `confirm`
/// declines. `confirm` receives the current and new versions.
pub fn apply_update(
    manifest: &Manifest,
    new_version: &Version,
    dry_run: bool,
    confirm: impl FnOnce(&Version, &Version) -> bool,
) -> Result<UpdateOutcome, VersionError> {
    if dry_run {
        return Ok(UpdateOutcome::DryRun);
    }
    if !confirm(&manifest.version, new_version) {
        return Ok(UpdateOutcome::Cancelled);
    }
    manifest.write_version(new_version).map(UpdateOutcome::Applied)
}

fn lookup_table<'a>(root: &'a toml::Table, keys: &[&str]) -> Option<&'a toml::Table> {
    keys.iter()
        .try_fold(root, |table, key| table.get(*key)?.as_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_strict() {
        assert_eq!("1.2.3".parse::<Version>().unwrap(), Version::new(1, 2, 3));
        for bad in ["1.2", "1.2.3.4", "v1.2.3", "1.2.x", "1..3", "1.2.-3", ""] {
            assert!(bad.parse::<Version>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_bump() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionComponent::Patch).unwrap().to_string(), "1.2.4");
        assert_eq!(v.bump(VersionComponent::Minor).unwrap().to_string(), "1.3.0");
        assert_eq!(v.bump(VersionComponent::Major).unwrap().to_string(), "2.0.0");
    }

    #[test]
    fn test_bump_out_of_range() {
        let v: Version = format!("1.{}.3", u64::MAX).parse().unwrap();
        assert!(matches!(
            v.bump(VersionComponent::Minor),
            Err(VersionError::Overflow { component: VersionComponent::Minor, .. })
        ));
        assert_eq!(
            v.bump(VersionComponent::Patch).unwrap().to_string(),
            format!("1.{}.4", u64::MAX)
        );
        assert_eq!(v.bump(VersionComponent::Major).unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_find_project_root() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CARGO_FILE), "[package]\nversion = \"0.1.0\"\n").unwrap();
        let nested = temp.path().join("src").join("bin");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), temp.path());
    }

    #[test]
    fn test_render_only_touches_owning_table() {
        let temp = TempDir::new().unwrap();
        let content = "[package]\nname = \"demo\"\nversion = \"0.1.0\" # keep\n\n[dependencies.foo]\nversion = \"9.9.9\"\n";
        fs::write(temp.path().join(CARGO_FILE), content).unwrap();
        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.table, "package");
        let rendered = manifest.render_with(&Version::new(0, 2, 0)).unwrap();
        assert!(rendered.contains("version = \"0.2.0\" # keep"));
        assert!(rendered.contains("version = \"9.9.9\""));
    }

    #[test]
    fn test_pyproject_prefers_poetry() {
        let temp = TempDir::new().unwrap();
        let content = "[project]\nname = \"demo\"\nversion = \"3.0.0\"\n\n[tool.poetry]\nname = \"my-pkg\"\nversion = \"1.2.3\"\n";
        fs::write(temp.path().join(PYPROJECT_FILE), content).unwrap();
        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.version, Version::new(1, 2, 3));
        assert_eq!(manifest.table, "tool.poetry");
        assert_eq!(
            manifest.init_file().unwrap(),
            temp.path().join("my_pkg").join("__init__.py")
        );
    }

    #[test]
    fn test_missing_version() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CARGO_FILE), "[package]\nname = \"demo\"\n").unwrap();
        assert!(matches!(
            Manifest::load(temp.path()),
            Err(VersionError::MissingVersion(_))
        ));
    }
}
