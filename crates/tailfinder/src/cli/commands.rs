//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::provider::Provider;

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Flight number, e.g. BA123 (case-insensitive)
    pub flight: String,

    /// Flight date as YYYY-MM-DD or an RFC 3339 timestamp [default: today]
    #[arg(short, long)]
    pub date: Option<String>,

    /// Data provider [default: your saved preference]
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Open command arguments.
#[derive(Debug, Args)]
pub struct OpenCommand {
    /// Application path, e.g. /aircraft/BA123/2026-10-29/flightaware
    pub path: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Recent searches command arguments.
#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Re-run entry N (1 is the most recent)
    #[arg(short, long, value_name = "N")]
    pub run: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Provider preference command arguments.
#[derive(Debug, Args)]
pub struct ProviderCommand {
    /// New preferred provider; omit to show the current one
    #[arg(value_enum)]
    pub provider: Option<ProviderArg>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Provider argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// AeroDataBox API
    Aerodatabox,
    /// FlightAware API
    Flightaware,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Aerodatabox => Self::AeroDataBox,
            ProviderArg::Flightaware => Self::FlightAware,
        }
    }
}

/// Output format for views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_arg_conversion() {
        assert_eq!(
            Provider::from(ProviderArg::Aerodatabox),
            Provider::AeroDataBox
        );
        assert_eq!(
            Provider::from(ProviderArg::Flightaware),
            Provider::FlightAware
        );
    }

    #[test]
    fn test_provider_arg_names_match_wire_names() {
        for arg in ProviderArg::value_variants() {
            let name = arg.to_possible_value().unwrap();
            assert_eq!(name.get_name(), Provider::from(*arg).as_str());
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_search_command_debug() {
        let cmd = SearchCommand {
            flight: "BA123".to_string(),
            date: None,
            provider: Some(ProviderArg::Flightaware),
            format: OutputFormat::Json,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("BA123"));
        assert!(debug_str.contains("Flightaware"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
