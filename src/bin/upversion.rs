//! Bump or set the version of the enclosing project.

use anyhow::Result;
use clap::Parser;
use hydra_buddies::cli::confirm;
use hydra_buddies::cli::upversion::{UpdateArgs, UpversionCli, UpversionCommand};
use hydra_buddies::logging::{init_logging, level_for};
use hydra_buddies::version::{
    Manifest, UpdateOutcome, Version, VersionComponent, apply_update, find_project_root,
};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = UpversionCli::parse();
    init_logging(&cli.log, level_for(cli.verbose))?;

    let outcome = match cli.command {
        UpversionCommand::Current => run_current(),
        UpversionCommand::Bump { component, update } => run_bump(component, update),
        UpversionCommand::Major(update) => run_bump(VersionComponent::Major, update),
        UpversionCommand::Minor(update) => run_bump(VersionComponent::Minor, update),
        UpversionCommand::Patch(update) => run_bump(VersionComponent::Patch, update),
        UpversionCommand::Set { version, update } => run_set(&version, update),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn load_manifest() -> Result<Manifest> {
    let cwd = std::env::current_dir()?;
    let root = find_project_root(&cwd);
    Ok(Manifest::load(&root)?)
}

fn run_current() -> Result<()> {
    let manifest = load_manifest()?;
    println!("Current version: {}", manifest.version);
    Ok(())
}

fn run_bump(component: VersionComponent, update: UpdateArgs) -> Result<()> {
    let manifest = load_manifest()?;
    let new_version = manifest.version.bump(component)?;
    run_update(&manifest, new_version, update, "Version updated")
}

fn run_set(version: &str, update: UpdateArgs) -> Result<()> {
    // Validate before touching the manifest.
    let new_version: Version = version.parse()?;
    let manifest = load_manifest()?;
    run_update(&manifest, new_version, update, "Version set")
}

fn run_update(
    manifest: &Manifest,
    new_version: Version,
    update: UpdateArgs,
    done: &str,
) -> Result<()> {
    let mut prompt_error = None;
    let outcome = apply_update(manifest, &new_version, update.dry_run, |current, new| {
        if update.yes {
            return true;
        }
        match confirm(&format!("Update version {} -> {}?", current, new)) {
            Ok(answer) => answer,
            Err(e) => {
                prompt_error = Some(e);
                false
            }
        }
    })?;
    if let Some(e) = prompt_error {
        return Err(e.into());
    }

    match outcome {
        UpdateOutcome::DryRun => {
            println!("Dry run: version would be updated to {}", new_version);
        }
        UpdateOutcome::Cancelled => println!("Operation cancelled."),
        UpdateOutcome::Applied(files) => {
            println!("{}: {} -> {}", done, manifest.version, new_version);
            for file in files {
                println!("  {}", file.display());
            }
        }
    }
    Ok(())
}
