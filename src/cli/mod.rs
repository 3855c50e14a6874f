//! CLI module for frontend-infra
//!
//! This module provides the command-line interface,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod diff;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// frontend-infra - synthesize the website bucket and CDN stacks
///
/// Declares an S3 website bucket and a CloudFront distribution in front of
/// it, and writes them out as CloudFormation templates.
#[derive(Parser, Debug, Clone)]
#[command(name = "frontend-infra")]
#[command(version)]
#[command(about = "Synthesize CloudFormation stacks for a static frontend", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Context values (KEY=VALUE); env=prod selects the environment
    #[arg(short = 'c', long = "context", global = true, action = clap::ArgAction::Append)]
    pub context: Vec<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(long, global = true, env = "FRONTEND_INFRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize templates into a cloud assembly
    Synth(commands::synth::SynthArgs),

    /// List the stacks in deployment order
    #[command(visible_alias = "ls")]
    List(commands::list::ListArgs),

    /// Compare synthesized templates with a previous assembly
    Diff(commands::diff::DiffArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
