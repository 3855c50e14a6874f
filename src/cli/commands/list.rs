//! List command
//!
//! Prints the stacks of the app in deployment order.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use serde::Serialize;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Also show target environment and dependencies
    #[arg(long, short = 'l')]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct StackSummary<'a> {
    name: &'a str,
    environment: String,
    dependencies: &'a [String],
}

impl Runnable for ListArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (app, _) = ctx.compose()?;
        let assembly = app.synth()?;

        let summaries: Vec<StackSummary<'_>> = assembly
            .stacks()
            .iter()
            .map(|s| StackSummary {
                name: &s.name,
                environment: s.environment.to_string(),
                dependencies: &s.dependencies,
            })
            .collect();

        if ctx.output.is_json() {
            ctx.output.json(&summaries)?;
            return Ok(0);
        }

        if !self.long {
            for summary in &summaries {
                ctx.output.plain(summary.name);
            }
            return Ok(0);
        }

        let rows: Vec<Vec<String>> = summaries
            .iter()
            .map(|s| {
                vec![
                    s.name.to_string(),
                    s.environment.clone(),
                    if s.dependencies.is_empty() {
                        "-".to_string()
                    } else {
                        s.dependencies.join(", ")
                    },
                ]
            })
            .collect();
        ctx.output
            .table(&["Stack", "Environment", "Depends on"], &rows);
        Ok(0)
    }
}
