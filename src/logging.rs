//! Tracing subscriber setup shared by both binaries.

use anyhow::Result;
use std::fs::OpenOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Level used when neither `--verbose` nor `--debug` is given.
pub const DEFAULT_LEVEL: Level = Level::WARN;

pub fn level_for(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { DEFAULT_LEVEL }
}

/// Install the global subscriber for a `--log` target.
///
/// `target` is `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a file name that
/// is opened in append mode.
pub fn init_logging(target: &str, level: Level) -> Result<()> {
    match target {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(false), Level::WARN);
        assert_eq!(level_for(true), Level::DEBUG);
    }
}
