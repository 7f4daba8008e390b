//! `buddy`: inspect and manage layered YAML configuration directories.

use anyhow::Result;
use clap::Parser;
use hydra_buddies::cli::keys::{ListKeysArgs, ListMode};
use hydra_buddies::cli::read::{GetArgs, OutputFormat, ReadArgs};
use hydra_buddies::cli::variants::{AddConfigArgs, RemoveConfigArgs};
use hydra_buddies::cli::{Cli, Command, confirm};
use hydra_buddies::config::tree::render_scalar;
use hydra_buddies::config::{ConfigPaths, display_name, normalize_config_name};
use hydra_buddies::error::{BuddyError, ErrorCode};
use hydra_buddies::keys::{collect_for_variant, collect_full, top_level_lines};
use hydra_buddies::logging::{init_logging, level_for};
use hydra_buddies::reader::Reader;
use hydra_buddies::scaffold;
use hydra_buddies::variants::{RemoveOutcome, add_config, remove_config};
use serde_yaml::Value;
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log, level_for(cli.wants_debug()))?;

    let outcome = match cli.command {
        Command::Read(args) => run_read(args),
        Command::Get(args) => run_get(args),
        Command::ListKeys(args) => run_list_keys(args),
        Command::Init => run_init(),
        Command::AddConfig(args) => run_add_config(args),
        Command::RemoveConfig(args) => run_remove_config(args),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<BuddyError>() {
            // User-facing failures are reported as a single line.
            Some(e) if is_user_facing(e) => {
                eprintln!("{}", e);
                Ok(ExitCode::FAILURE)
            }
            _ => Err(err),
        },
    }
}

fn is_user_facing(err: &BuddyError) -> bool {
    matches!(
        err.code,
        ErrorCode::ValidationFailed
            | ErrorCode::AttributeNotFound
            | ErrorCode::KeyNotFound
            | ErrorCode::NavigationFailed
            | ErrorCode::ConfigNotFound
    )
}

fn open_reader(name: &str, path: Option<&Path>) -> Result<Reader> {
    let paths = ConfigPaths::discover(path);
    debug!(dir = %paths.config_dir.display(), source = %paths.source, "Opening configuration");
    Ok(Reader::open(name, &paths.config_dir)?)
}

fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn run_read(args: ReadArgs) -> Result<()> {
    let reader = open_reader(&args.name, args.path.as_deref())?;
    match (args.resolve, args.format) {
        (false, OutputFormat::Yaml) => println!("{}", reader),
        (false, format) => print_value(reader.tree(), format)?,
        (true, format) => print_value(&reader.resolved()?, format)?,
    }
    Ok(())
}

fn run_get(args: GetArgs) -> Result<()> {
    let mut reader = open_reader(&args.name, args.path.as_deref())?;
    if args.resolve {
        let resolved = reader.resolved()?;
        reader = Reader::from_tree(reader.name(), reader.config_dir(), resolved);
    }

    let value = reader.get(&args.key)?;
    match value {
        Value::Mapping(_) | Value::Sequence(_) => print!("{}", serde_yaml::to_string(&value)?),
        scalar => println!("{}", render_scalar(&scalar)),
    }
    Ok(())
}

fn run_list_keys(args: ListKeysArgs) -> Result<()> {
    let root_name = normalize_config_name(&args.name);
    debug!(name = %root_name, label = %display_name(&root_name), mode = ?args.mode(), "Listing keys");

    match args.mode() {
        ListMode::Structured => {
            let paths = ConfigPaths::discover(args.path.as_deref());
            let index = collect_for_variant(&paths.config_dir, &root_name)?;
            for line in index.lines(args.values) {
                println!("{}", line);
            }
        }
        ListMode::Full => {
            let reader = open_reader(&args.name, args.path.as_deref())?;
            let index = collect_full(reader.tree(), display_name(reader.name()));
            for line in index.lines(args.values) {
                println!("{}", line);
            }
        }
        ListMode::TopLevel => {
            let reader = open_reader(&args.name, args.path.as_deref())?;
            for line in top_level_lines(reader.tree(), args.values) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn run_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let written = scaffold::init(&cwd)?;
    println!("Configuration directory initialized ({} files).", written.len());
    Ok(())
}

fn run_add_config(args: AddConfigArgs) -> Result<()> {
    let paths = ConfigPaths::local();
    let report = add_config(&paths.config_dir, &args.name)?;
    println!("Configuration '{}' created.", args.name);
    println!("- Root file: {}", report.config_file.display());
    println!(
        "- {} group files copied into subdirectories.",
        report.copied.len()
    );
    Ok(())
}

fn run_remove_config(args: RemoveConfigArgs) -> Result<()> {
    let paths = ConfigPaths::local();
    let mut prompt_error = None;
    let outcome = remove_config(&paths.config_dir, &args.name, |plan| {
        if args.force {
            return true;
        }
        let prompt = format!(
            "About to delete {} configuration files for '{}'. Continue?",
            plan.file_count(),
            args.name
        );
        confirm(&prompt).unwrap_or_else(|e| {
            prompt_error = Some(e);
            false
        })
    })?;
    if let Some(e) = prompt_error {
        return Err(e.into());
    }

    match outcome {
        RemoveOutcome::Cancelled => println!("Operation cancelled."),
        RemoveOutcome::Removed(report) => {
            for (path, error) in &report.failures {
                eprintln!("Could not remove {}: {}", path.display(), error);
            }
            println!("Configuration '{}' removed.", args.name);
            println!("- {} files deleted in total.", report.removed.len());
        }
    }
    Ok(())
}
