//! Synth command
//!
//! Synthesizes every stack and writes the cloud assembly, or prints a single
//! stack's template to stdout.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Print only this stack's template to stdout
    pub stack: Option<String>,

    /// Output directory (defaults to app.output_dir, usually cdk.out)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

impl Runnable for SynthArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (app, _) = ctx.compose()?;
        let assembly = app.synth()?;

        if let Some(name) = &self.stack {
            let stack = assembly.stack(name)?;
            ctx.output.plain(&stack.template_json()?);
            return Ok(0);
        }

        let out = self
            .out
            .clone()
            .unwrap_or_else(|| ctx.config.app.output_dir.clone());
        let written = assembly.write_to(&out)?;

        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "output_dir": out,
                "stacks": assembly.stacks().iter().map(|s| &s.name).collect::<Vec<_>>(),
                "files": written,
            }))?;
            return Ok(0);
        }

        ctx.output.banner("FRONTEND-INFRA SYNTH");
        ctx.output.section("Synthesized stacks");
        for stack in assembly.stacks() {
            ctx.output.info(&format!(
                "{}: {} resources, {} outputs",
                stack.name,
                stack.template.resources.len(),
                stack.template.outputs.len()
            ));
            ctx.output
                .plain(&format!("  {}", out.join(stack.template_file()).display()));
        }
        ctx.output.plain(&format!(
            "Successfully synthesized to {}",
            out.display()
        ));
        Ok(0)
    }
}
