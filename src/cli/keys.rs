//! `list-keys` subcommand.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the list-keys subcommand
#[derive(Args, Debug)]
pub struct ListKeysArgs {
    /// Configuration name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Configuration directory (overrides discovery)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Show leaf keys at every level instead of top-level keys only
    #[arg(short, long)]
    pub full: bool,

    /// Show scalar values next to their keys
    #[arg(short, long)]
    pub values: bool,

    /// Follow the defaults list and group keys by source file
    #[arg(short, long)]
    pub resolve: bool,

    /// Log each step of the collection
    #[arg(short, long)]
    pub debug: bool,
}

/// How `list-keys` walks the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Follow `defaults` from the root file, keys grouped by source
    Structured,
    /// Every leaf of the composed tree
    Full,
    /// Top-level keys of the composed tree
    TopLevel,
}

impl ListKeysArgs {
    pub fn mode(&self) -> ListMode {
        if self.resolve {
            ListMode::Structured
        } else if self.full {
            ListMode::Full
        } else {
            ListMode::TopLevel
        }
    }
}
