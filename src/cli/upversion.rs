//! CLI definitions for the `upversion` binary.

use crate::version::VersionComponent;
use clap::{Args, Parser, Subcommand};

/// Manage the project version in pyproject.toml or Cargo.toml
#[derive(Parser, Debug)]
#[command(name = "upversion", author, version, about, long_about = None)]
pub struct UpversionCli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: UpversionCommand,
}

#[derive(Subcommand, Debug)]
pub enum UpversionCommand {
    /// Print the current version
    Current,

    /// Increment one component of the version
    Bump {
        #[arg(value_enum)]
        component: VersionComponent,
        #[command(flatten)]
        update: UpdateArgs,
    },

    /// Increment the major version
    Major(UpdateArgs),

    /// Increment the minor version
    Minor(UpdateArgs),

    /// Increment the patch version
    Patch(UpdateArgs),

    /// Set an explicit X.Y.Z version
    Set {
        #[arg(value_name = "VERSION")]
        version: String,
        #[command(flatten)]
        update: UpdateArgs,
    },
}

/// Flags shared by every command that writes a version
#[derive(Args, Debug, Clone, Copy)]
pub struct UpdateArgs {
    /// Show the new version without changing any file
    #[arg(short, long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_parses_component() {
        let cli = UpversionCli::parse_from(["upversion", "bump", "minor", "-d"]);
        match cli.command {
            UpversionCommand::Bump { component, update } => {
                assert_eq!(component, VersionComponent::Minor);
                assert!(update.dry_run);
                assert!(!update.yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_shortcut_commands() {
        let cli = UpversionCli::parse_from(["upversion", "patch", "--yes"]);
        assert!(matches!(cli.command, UpversionCommand::Patch(UpdateArgs { yes: true, .. })));
    }
}
