//! `add-config` and `remove-config` subcommands.
//!
//! Both operate on `.hydra-conf` in the current directory.

use clap::Args;

/// Arguments for the add-config subcommand
#[derive(Args, Debug)]
pub struct AddConfigArgs {
    /// Name of the new configuration
    #[arg(value_name = "NAME")]
    pub name: String,
}

/// Arguments for the remove-config subcommand
#[derive(Args, Debug)]
pub struct RemoveConfigArgs {
    /// Name of the configuration to remove
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}
