//! Cloud assembly: the synthesized output of an app.
//!
//! An assembly directory holds one `{stack}.template.json` per stack and a
//! `manifest.json` describing each stack artifact, its target environment and
//! the stacks it must be deployed after.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, ErrorContext, Result};
use crate::stack::Environment;
use crate::template::Template;

/// Schema version written to `manifest.json`.
pub const MANIFEST_VERSION: &str = "36.0.0";

/// File name of the assembly manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact type of a CloudFormation stack.
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// A synthesized stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StackArtifact {
    pub name: String,
    pub environment: Environment,
    pub template: Template,
    /// Stacks that must be deployed first
    pub dependencies: Vec<String>,
}

impl StackArtifact {
    /// File name of the template inside the assembly directory.
    pub fn template_file(&self) -> String {
        template_file_name(&self.name)
    }

    /// The template as pretty JSON with a trailing newline.
    pub fn template_json(&self) -> Result<String> {
        self.template.to_json_pretty()
    }
}

/// File name of a stack's template.
pub fn template_file_name(stack: &str) -> String {
    format!("{}.template.json", stack)
}

/// `manifest.json` contents.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: IndexMap<String, ArtifactManifest>,
}

/// One artifact entry in the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactManifest {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
}

/// The synthesized stacks, in deployment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudAssembly {
    stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub fn new(stacks: Vec<StackArtifact>) -> Self {
        Self { stacks }
    }

    pub fn stacks(&self) -> &[StackArtifact] {
        &self.stacks
    }

    /// Look up a stack by name.
    pub fn stack(&self, name: &str) -> Result<&StackArtifact> {
        self.stacks
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::StackNotFound(name.to_string()))
    }

    /// Build the manifest describing every artifact.
    pub fn manifest(&self) -> Manifest {
        let artifacts = self
            .stacks
            .iter()
            .map(|stack| {
                (
                    stack.name.clone(),
                    ArtifactManifest {
                        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                        environment: stack.environment.to_string(),
                        properties: ArtifactProperties {
                            template_file: stack.template_file(),
                        },
                        dependencies: stack.dependencies.clone(),
                    },
                )
            })
            .collect();

        Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        }
    }

    /// Write templates and manifest into `dir`, creating it if needed.
    /// Returns the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.stacks.len() + 1);
        for stack in &self.stacks {
            let path = dir.join(stack.template_file());
            fs::write(&path, stack.template_json()?)
                .with_context(|| format!("Failed to write template: {}", path.display()))?;
            info!(stack = %stack.name, path = %path.display(), "Wrote template");
            written.push(path);
        }

        let mut manifest = serde_json::to_string_pretty(&self.manifest())?;
        manifest.push('\n');
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, manifest)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        info!(path = %path.display(), "Wrote assembly manifest");
        written.push(path);

        Ok(written)
    }
}
