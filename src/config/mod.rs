//! Layered YAML configuration handling.
//!
//! A configuration directory (`.hydra-conf/`) holds one root file per variant
//! (`config.yaml`, `config_<name>.yaml`) and group subdirectories with one
//! file per option (`database/default.yaml`, `database/prod.yaml`, ...).
//!
//! ## Pipeline
//! 1. **Compose** - expand the root file's `defaults` list, deep-merging
//!    each referenced file under its group
//! 2. **Promote** - lift `secrets.<section>` entries to the root
//! 3. **Interpolate** - resolve `${path}` and `${oc.env:VAR}` expressions
//!
//! ## Environment Variables
//! - `HYDRA_CONFIG_PATH` - Configuration directory (overridden by `--path`)

pub mod compose;
pub mod interpolate;
mod loader;
mod merge;
pub mod tree;

pub use compose::{DefaultsEntry, ResolutionContext, resolve_tree};
pub use loader::{
    CONFIG_DIR_NAME, CONFIG_PATH_ENV, ConfigPaths, DEFAULT_LABEL, DEFAULT_ROOT, PathSource,
    VARIANT_PREFIX, display_name, normalize_config_name,
};
pub use merge::{SECRETS_KEY, deep_merge, deep_merge_all, promote_secrets};
