//! Diff command
//!
//! Compares freshly synthesized templates with the templates of a previous
//! assembly directory. Exits with 1 when anything differs.

use super::{CommandContext, Runnable};
use crate::cli::diff::{ColorizedDiff, DiffOptions};
use anyhow::Result;
use clap::Parser;
use frontend_infra::assembly::StackArtifact;
use frontend_infra::error::{Error, ErrorContext};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the diff command
#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Compare only this stack
    pub stack: Option<String>,

    /// Directory holding the previously synthesized templates
    #[arg(long, required = true)]
    pub against: PathBuf,

    /// Number of context lines around each change
    #[arg(long, default_value = "3")]
    pub context_lines: usize,
}

#[derive(Debug, Serialize)]
struct StackDiff {
    stack: String,
    new_stack: bool,
    changed: bool,
    additions: usize,
    deletions: usize,
    changes: usize,
}

impl Runnable for DiffArgs {
    fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        if !self.against.is_dir() {
            return Err(Error::TemplateNotFound(self.against.clone()).into());
        }

        let (app, _) = ctx.compose()?;
        let assembly = app.synth()?;
        let stacks: Vec<&StackArtifact> = match &self.stack {
            Some(name) => vec![assembly.stack(name)?],
            None => assembly.stacks().iter().collect(),
        };

        let differ = ColorizedDiff::with_options(DiffOptions {
            context_lines: self.context_lines,
            use_color: ctx.output.use_color(),
        });

        let mut results = Vec::with_capacity(stacks.len());
        for stack in stacks {
            let path = self.against.join(stack.template_file());
            let new_stack = !path.exists();
            // A stack missing from the previous assembly diffs against nothing
            let old = if new_stack {
                ctx.output.warning(&format!(
                    "No previous template for {} in {}",
                    stack.name,
                    self.against.display()
                ));
                String::new()
            } else {
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template: {}", path.display()))?
            };
            let new = stack.template_json()?;

            let summary = differ.summary(&old, &new);
            let changed = summary.has_changes();

            if !ctx.output.is_json() {
                ctx.output.section(&format!("Stack {}", stack.name));
                if changed {
                    ctx.output.plain(&differ.diff(
                        &old,
                        &new,
                        &path.display().to_string(),
                        &format!("{} (synthesized)", stack.template_file()),
                    ));
                }
                let status = if new_stack {
                    format!("new stack, {}", summary.format(ctx.output.use_color()))
                } else {
                    summary.format(ctx.output.use_color())
                };
                ctx.output.plain(&format!("{}: {}", stack.name, status));
            }

            results.push(StackDiff {
                stack: stack.name.clone(),
                new_stack,
                changed,
                additions: summary.additions,
                deletions: summary.deletions,
                changes: summary.changes,
            });
        }

        if ctx.output.is_json() {
            ctx.output.json(&results)?;
        }

        let differences = results.iter().any(|r| r.changed);
        ctx.output.flush();
        Ok(i32::from(differences))
    }
}
