//! Cursor-based reader over a composed configuration.
//!
//! ```no_run
//! use hydra_buddies::reader::Reader;
//!
//! let mut reader = Reader::open("dev", ".hydra-conf")?;
//! {
//!     let db = reader.walk(&["database", "credentials"])?;
//!     println!("{:?}", db.attr("username")?);
//! } // cursor is back at the root here
//! println!("{:?}", reader.index("project")?);
//! # Ok::<(), hydra_buddies::error::BuddyError>(())
//! ```

use crate::config::{ResolutionContext, normalize_config_name, resolve_tree};
use crate::error::{BuddyError, BuddyResult};
use serde_yaml::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A composed configuration with a movable cursor.
///
/// The tree is kept unresolved; [`Reader::resolved`] produces the fully
/// interpolated form on demand.
#[derive(Debug, Clone)]
pub struct Reader {
    /// Root file stem, e.g. `config` or `config_dev`
    name: String,
    config_dir: PathBuf,
    tree: Value,
    /// Segments from the root to the cursor
    context: Vec<String>,
}

impl Reader {
    /// Compose the variant `name` from `config_dir`.
    ///
    /// A missing root file or referenced default is a load error.
    pub fn open(name: &str, config_dir: impl Into<PathBuf>) -> BuddyResult<Self> {
        let name = normalize_config_name(name);
        let config_dir = config_dir.into();
        let tree = ResolutionContext::new(&config_dir).compose(&name)?;
        debug!(name = %name, dir = %config_dir.display(), "Opened configuration");
        Ok(Self {
            name,
            config_dir,
            tree,
            context: Vec::new(),
        })
    }

    /// Build a reader over an already composed tree.
    pub fn from_tree(name: &str, config_dir: impl Into<PathBuf>, tree: Value) -> Self {
        Self {
            name: normalize_config_name(name),
            config_dir: config_dir.into(),
            tree,
            context: Vec::new(),
        }
    }

    /// Re-compose from another directory, discarding tree and cursor.
    ///
    /// On failure the reader is left as it was.
    pub fn update_path(&mut self, config_dir: impl Into<PathBuf>) -> BuddyResult<()> {
        let config_dir = config_dir.into();
        let tree = ResolutionContext::new(&config_dir).compose(&self.name)?;
        self.config_dir = config_dir;
        self.tree = tree;
        self.context.clear();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The composed, unresolved tree.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Segments walked from the root to the cursor.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// The mapping the cursor points at.
    pub fn cursor(&self) -> &Value {
        self.context
            .iter()
            .try_fold(&self.tree, |node, segment| node.get(segment.as_str()))
            .unwrap_or(&self.tree)
    }

    /// Look `key` up relative to the cursor.
    pub fn attr(&self, key: &str) -> BuddyResult<&Value> {
        self.cursor()
            .as_mapping()
            .and_then(|map| map.get(key))
            .ok_or_else(|| BuddyError::attribute_not_found(&self.qualified(key)))
    }

    /// Look `key` up at the root of the tree, ignoring the cursor.
    pub fn index(&self, key: &str) -> BuddyResult<&Value> {
        self.tree
            .get(key)
            .ok_or_else(|| BuddyError::key_not_found(key))
    }

    /// Move the cursor down through `segments`.
    ///
    /// Every segment must name a mapping below the previous one; otherwise
    /// nothing moves. The returned guard puts the cursor back when dropped.
    pub fn walk<S: AsRef<str>>(&mut self, segments: &[S]) -> BuddyResult<Walk<'_>> {
        let mut node = self.cursor();
        for segment in segments {
            let segment = segment.as_ref();
            node = match node.get(segment) {
                Some(child @ Value::Mapping(_)) => child,
                Some(_) => return Err(BuddyError::navigation(segment, "not a mapping")),
                None => return Err(BuddyError::navigation(segment, "no such key")),
            };
        }

        let restore_to = self.context.len();
        self.context
            .extend(segments.iter().map(|s| s.as_ref().to_string()));
        Ok(Walk {
            reader: self,
            restore_to,
        })
    }

    /// Fetch a dotted key: walk to its parent, then read the last segment.
    pub fn get(&mut self, dotted: &str) -> BuddyResult<Value> {
        let segments: Vec<&str> = dotted.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(BuddyError::attribute_not_found(dotted));
        };
        let scope = self.walk(parents)?;
        let value = scope.attr(last)?.clone();
        Ok(value)
    }

    /// Promote secrets and resolve interpolations on a copy of the tree.
    pub fn resolved(&self) -> BuddyResult<Value> {
        resolve_tree(&self.tree)
    }

    fn qualified(&self, key: &str) -> String {
        if self.context.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.context.join("."), key)
        }
    }
}

impl fmt::Display for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_yaml::to_string(&self.tree).map_err(|_| fmt::Error)?;
        write!(f, "{}", rendered.trim_end())
    }
}

/// Scoped cursor position returned by [`Reader::walk`].
///
/// Dereferences to the reader; dropping it restores the previous cursor,
/// whether the scope ends normally, through `?`, or by unwinding.
pub struct Walk<'a> {
    reader: &'a mut Reader,
    restore_to: usize,
}

impl Deref for Walk<'_> {
    type Target = Reader;

    fn deref(&self) -> &Reader {
        self.reader
    }
}

impl DerefMut for Walk<'_> {
    fn deref_mut(&mut self) -> &mut Reader {
        self.reader
    }
}

impl Drop for Walk<'_> {
    fn drop(&mut self) {
        self.reader.context.truncate(self.restore_to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn reader() -> Reader {
        let tree: Value = serde_yaml::from_str(
            r#"
project:
  name: test-project
database:
  host: localhost
  port: 5432
  credentials:
    username: user
"#,
        )
        .unwrap();
        Reader::from_tree("default", ".hydra-conf", tree)
    }

    #[test]
    fn test_name_is_normalized() {
        assert_eq!(reader().name(), "config");
    }

    #[test]
    fn test_attr_is_cursor_relative() {
        let mut reader = reader();
        let scope = reader.walk(&["database"]).unwrap();
        assert_eq!(scope.attr("host").unwrap().as_str(), Some("localhost"));
        assert!(scope.attr("project").is_err());
        // Subscript access ignores the cursor
        assert!(scope.index("project").is_ok());
    }

    #[test]
    fn test_nested_walks_restore_in_order() {
        let mut reader = reader();
        {
            let mut outer = reader.walk(&["database"]).unwrap();
            {
                let inner = outer.walk(&["credentials"]).unwrap();
                assert_eq!(inner.context(), ["database", "credentials"]);
            }
            assert_eq!(outer.context(), ["database"]);
        }
        assert!(reader.context().is_empty());
    }

    #[test]
    fn test_walk_failure_leaves_cursor() {
        let mut reader = reader();
        let err = reader.walk(&["database", "port"]).err().unwrap();
        assert_eq!(err.code, ErrorCode::NavigationFailed);
        assert!(reader.context().is_empty());
    }

    #[test]
    fn test_attr_miss_names_full_path() {
        let mut reader = reader();
        let scope = reader.walk(&["database"]).unwrap();
        let err = scope.attr("nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::AttributeNotFound);
        assert!(err.message.contains("database.nope"));
    }

    #[test]
    fn test_get_dotted() {
        let mut reader = reader();
        assert_eq!(
            reader.get("database.credentials.username").unwrap().as_str(),
            Some("user")
        );
        assert!(reader.context().is_empty());
        assert_eq!(
            reader.get("database.missing").unwrap_err().code,
            ErrorCode::AttributeNotFound
        );
        assert_eq!(
            reader.get("nowhere.key").unwrap_err().code,
            ErrorCode::NavigationFailed
        );
    }

    #[test]
    fn test_display_renders_yaml() {
        let rendered = reader().to_string();
        assert!(rendered.starts_with("project:"));
        assert!(rendered.contains("port: 5432"));
    }
}
