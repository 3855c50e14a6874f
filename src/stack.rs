//! Stacks: named, independently deployable sets of resources.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::construct::ConstructPath;
use crate::error::{Error, Result};
use crate::template::{Expr, Output, Resource, Template};

/// CloudFormation stack names: letters, digits and hyphens, starting with a
/// letter.
static STACK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("Invalid stack name regex"));

/// Maximum length of a stack name.
const MAX_STACK_NAME_LEN: usize = 128;

/// Metadata key holding the construct path of a resource.
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

/// Target account and region of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    /// AWS account id
    pub account: String,
    /// AWS region
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

/// A stack under construction.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    environment: Environment,
    paths: HashSet<ConstructPath>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
    dependencies: Vec<String>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new(name: impl Into<String>, environment: Environment) -> Result<Self> {
        let name = name.into();
        validate_stack_name(&name)?;
        Ok(Self {
            name,
            environment,
            paths: HashSet::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
            dependencies: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Reserve a construct path, rejecting duplicates.
    fn reserve(&mut self, path: &ConstructPath) -> Result<()> {
        if !self.paths.insert(path.clone()) {
            return Err(Error::DuplicateConstruct {
                stack: self.name.clone(),
                id: path.to_string(),
            });
        }
        Ok(())
    }

    /// Add a resource at `path`, returning its logical id.
    pub fn add_resource(&mut self, path: &ConstructPath, mut resource: Resource) -> Result<String> {
        self.reserve(path)?;
        let logical_id = path.logical_id();
        resource.metadata.insert(
            PATH_METADATA_KEY.to_string(),
            Expr::str(format!("{}/{}", self.name, path)),
        );
        debug!(
            stack = %self.name,
            path = %path,
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "Declared resource"
        );
        self.resources.insert(logical_id.clone(), resource);
        Ok(logical_id)
    }

    /// Add an output under `id`.
    pub fn add_output(&mut self, id: &str, output: Output) -> Result<()> {
        let path = ConstructPath::root(id)?;
        self.reserve(&path)?;
        self.outputs.insert(id.to_string(), output);
        Ok(())
    }

    /// Insert an output that is generated during synthesis. Existing outputs
    /// with the same id are left alone.
    pub(crate) fn ensure_output(&mut self, id: &str, output: Output) {
        self.outputs.entry(id.to_string()).or_insert(output);
    }

    /// Declare that this stack must be deployed after `other`.
    pub fn add_dependency(&mut self, other: &str) {
        if other != self.name && !self.dependencies.iter().any(|d| d == other) {
            self.dependencies.push(other.to_string());
        }
    }

    /// Explicit dependencies declared with [`Stack::add_dependency`].
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(logical_id)
    }

    pub fn has_resource(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut IndexMap<String, Resource> {
        &mut self.resources
    }

    pub fn outputs(&self) -> &IndexMap<String, Output> {
        &self.outputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut IndexMap<String, Output> {
        &mut self.outputs
    }

    /// Check that every `Ref`, `Fn::GetAtt` and `DependsOn` points at a
    /// resource declared in this stack.
    pub fn validate_references(&self) -> Result<()> {
        let mut refs = Vec::new();
        for resource in self.resources.values() {
            refs.extend(resource.references());
        }
        for output in self.outputs.values() {
            output.value.local_references(&mut refs);
        }
        match refs.into_iter().find(|id| !self.resources.contains_key(id)) {
            Some(logical_id) => Err(Error::UnresolvedReference {
                stack: self.name.clone(),
                logical_id,
            }),
            None => Ok(()),
        }
    }

    /// Render the template. Cross-stack references must already be resolved.
    pub fn to_template(&self) -> Template {
        Template {
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

fn validate_stack_name(name: &str) -> Result<()> {
    if name.len() > MAX_STACK_NAME_LEN {
        return Err(Error::invalid_stack_name(
            name,
            format!("must be at most {} characters", MAX_STACK_NAME_LEN),
        ));
    }
    if !STACK_NAME.is_match(name) {
        return Err(Error::invalid_stack_name(
            name,
            "must start with a letter and contain only letters, digits and hyphens",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new("123456789012", "us-east-1")
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(env().to_string(), "aws://123456789012/us-east-1");
    }

    #[test]
    fn test_stack_name_validation() {
        assert!(Stack::new("testpy-dev-s3", env()).is_ok());
        assert!(Stack::new("1stack", env()).is_err());
        assert!(Stack::new("stack_name", env()).is_err());
        assert!(Stack::new("a".repeat(129), env()).is_err());
    }

    #[test]
    fn test_duplicate_construct_rejected() {
        let mut stack = Stack::new("s", env()).unwrap();
        let path = ConstructPath::root("Bucket").unwrap();
        stack
            .add_resource(&path, Resource::new("AWS::S3::Bucket"))
            .unwrap();
        let err = stack
            .add_resource(&path, Resource::new("AWS::S3::Bucket"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateConstruct { .. }));
    }

    #[test]
    fn test_resource_carries_path_metadata() {
        let mut stack = Stack::new("s", env()).unwrap();
        let path = ConstructPath::root("Bucket").unwrap();
        let id = stack
            .add_resource(&path, Resource::new("AWS::S3::Bucket"))
            .unwrap();
        let resource = stack.resource(&id).unwrap();
        assert_eq!(
            resource.metadata.get(PATH_METADATA_KEY).and_then(Expr::as_str),
            Some("s/Bucket")
        );
    }

    #[test]
    fn test_validate_references() {
        let mut stack = Stack::new("s", env()).unwrap();
        let bucket = stack
            .add_resource(
                &ConstructPath::root("Bucket").unwrap(),
                Resource::new("AWS::S3::Bucket"),
            )
            .unwrap();
        stack
            .add_output("BucketName", Output::new(Expr::reference(&bucket)))
            .unwrap();
        assert!(stack.validate_references().is_ok());

        stack
            .add_output("Missing", Output::new(Expr::reference("Nope")))
            .unwrap();
        assert!(matches!(
            stack.validate_references(),
            Err(Error::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_self_dependency_ignored() {
        let mut stack = Stack::new("s", env()).unwrap();
        stack.add_dependency("s");
        stack.add_dependency("t");
        stack.add_dependency("t");
        assert_eq!(stack.dependencies(), ["t".to_string()]);
    }
}
