//! `read` and `get` subcommands.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the read subcommand
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Configuration name (`default`, `dev`, `config_dev`, ...)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Configuration directory (overrides discovery)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Promote secrets and resolve interpolations
    #[arg(short, long)]
    pub resolve: bool,

    /// Output format: yaml (default) or json
    #[arg(long, default_value = "yaml", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Configuration name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Dotted key, e.g. `database.host`
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Configuration directory (overrides discovery)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Read the value from the resolved configuration
    #[arg(short, long)]
    pub resolve: bool,
}

/// Output format for configuration dumps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid options: yaml, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("toml".parse::<OutputFormat>().is_err());
    }
}
