//! CLI command definitions for `buddy`.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod keys;
pub mod read;
pub mod upversion;
pub mod variants;

use clap::{Parser, Subcommand};
use keys::ListKeysArgs;
use read::{GetArgs, ReadArgs};
use std::io::Write;
use variants::{AddConfigArgs, RemoveConfigArgs};

/// Layered YAML configuration helper
#[derive(Parser, Debug)]
#[command(name = "buddy", author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Whether DEBUG logging was requested by any flag.
    pub fn wants_debug(&self) -> bool {
        self.verbose || matches!(&self.command, Command::ListKeys(args) if args.debug)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a configuration
    Read(ReadArgs),

    /// Print a single value by dotted key
    Get(GetArgs),

    /// List the keys of a configuration
    ListKeys(ListKeysArgs),

    /// Create a .hydra-conf directory from the built-in templates
    Init,

    /// Create a new configuration based on the default one
    AddConfig(AddConfigArgs),

    /// Remove a configuration and its group files
    RemoveConfig(RemoveConfigArgs),
}

/// Ask a yes/no question on stdout; anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
