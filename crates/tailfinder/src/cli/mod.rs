//! Command-line interface for tailfinder.
//!
//! This module provides the CLI structure for the `tailfind` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, OpenCommand, OutputFormat, ProviderArg, ProviderCommand, RecentCommand,
    SearchCommand,
};

/// tailfind - Find out which aircraft is flying your flight
///
/// Looks up the airframe assigned to a flight number on a given date, using
/// either the AeroDataBox or the FlightAware backend.
#[derive(Debug, Parser)]
#[command(name = "tailfind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up the aircraft for a flight
    Search(SearchCommand),

    /// Open an application path
    Open(OpenCommand),

    /// List or re-run recent searches
    Recent(RecentCommand),

    /// Show or set the preferred provider
    Provider(ProviderCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
