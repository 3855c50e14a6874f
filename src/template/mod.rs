//! CloudFormation template model.
//!
//! A [`Template`] is what a stack synthesizes to. Maps keep insertion order,
//! so rendering the same declaration twice yields byte-identical JSON.

mod intrinsic;

pub use intrinsic::Expr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;

/// What happens to a resource when it leaves the template or its stack is
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    /// Delete the physical resource.
    #[serde(rename = "Delete")]
    Destroy,
    /// Keep the physical resource, orphaned from the stack.
    Retain,
    /// Snapshot, then delete (only for resources that support snapshots).
    Snapshot,
}

/// A resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// CloudFormation resource type, e.g. `AWS::S3::Bucket`
    #[serde(rename = "Type")]
    pub resource_type: String,

    /// Resource properties
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Expr>,

    /// Explicit dependencies on other logical ids in the same template
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,

    /// Metadata, including the construct path
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Expr>,
}

impl Resource {
    /// Create an empty resource of the given type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
            metadata: IndexMap::new(),
        }
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set a property only when a value is present.
    pub fn with_optional_property<V: Into<Expr>>(
        self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(v) => self.with_property(key, v),
            None => self,
        }
    }

    /// Add an explicit dependency on another logical id.
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let id = logical_id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    /// Apply a removal policy to both replacement and deletion.
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }

    /// Get a property by name.
    pub fn property(&self, key: &str) -> Option<&Expr> {
        self.properties.get(key)
    }

    /// Every logical id this resource points at, through properties or
    /// `DependsOn`.
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        for value in self.properties.values() {
            value.local_references(&mut refs);
        }
        refs.extend(self.depends_on.iter().cloned());
        refs
    }
}

/// Name under which an output is exported for other stacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    #[serde(rename = "Name")]
    pub name: String,
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Expr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

impl Output {
    /// An output with just a value.
    pub fn new(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
            description: None,
            export: None,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Export the output under `name`.
    pub fn with_export(mut self, name: impl Into<String>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }
}

/// A rendered CloudFormation template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Resource>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Template {
    /// Render as pretty JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
