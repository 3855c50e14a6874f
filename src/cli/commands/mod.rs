//! Subcommands module for frontend-infra CLI
//!
//! This module contains all the subcommand implementations.

pub mod diff;
pub mod list;
pub mod synth;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use frontend_infra::app::{compose, App, Deployment};
use frontend_infra::config::Config;
use indexmap::IndexMap;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Context values from configuration, overridden by `--context`
    pub context: IndexMap<String, String>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> frontend_infra::error::Result<Self> {
        let use_color = !cli.no_color && config.app.color;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        let mut context = config.app.context.clone();
        for arg in &cli.context {
            let (key, value) = App::parse_context_arg(arg)?;
            context.insert(key, value);
        }

        Ok(Self {
            config,
            output,
            context,
        })
    }

    /// Build the app and declare the stacks.
    pub fn compose(&self) -> Result<(App, Deployment)> {
        let mut app = App::with_context(self.context.clone());
        let deployment = compose(&mut app, &self.config)?;
        self.output.debug(&format!(
            "Composed environment '{}' with prefix '{}'",
            deployment.environment, deployment.prefix
        ));
        Ok((app, deployment))
    }
}

/// Trait for runnable commands
pub trait Runnable {
    /// Execute the command, returning the process exit code
    fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
