//! Construct identity and logical id allocation.
//!
//! Every resource declared in a stack lives at a construct path such as
//! `FrontendBucket/Policy`. CloudFormation needs an alphanumeric logical id
//! for each resource, and that id must stay stable across synthesis runs so
//! redeploys update resources in place instead of replacing them. The id is
//! the path's human-readable components followed by an 8 digit hash of the
//! full path, which keeps ids unique even when sanitization collapses two
//! paths to the same text.

use crate::error::{Error, Result};

/// Path separator between construct ids.
pub const PATH_SEP: char = '/';

/// Components that are left out of the human-readable part of a logical id.
const HIDDEN_COMPONENTS: &[&str] = &["Resource", "Default"];

/// Length of the hash suffix appended to logical ids.
const HASH_LEN: usize = 8;

/// Maximum length of a CloudFormation logical id.
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Validate a single construct id.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::invalid_construct_id(id, "id must not be empty"));
    }
    if id.contains(PATH_SEP) {
        return Err(Error::invalid_construct_id(
            id,
            format!("id must not contain '{}'", PATH_SEP),
        ));
    }
    if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::invalid_construct_id(
            id,
            "id must contain at least one alphanumeric character",
        ));
    }
    Ok(())
}

/// A path of construct ids below a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructPath {
    components: Vec<String>,
}

impl ConstructPath {
    /// Create a path with a single, validated component.
    pub fn root(id: &str) -> Result<Self> {
        validate_id(id)?;
        Ok(Self {
            components: vec![id.to_string()],
        })
    }

    /// Extend the path with a child id.
    pub fn child(&self, id: &str) -> Result<Self> {
        validate_id(id)?;
        let mut components = self.components.clone();
        components.push(id.to_string());
        Ok(Self { components })
    }

    /// The path components, outermost first.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The innermost id.
    pub fn id(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Allocate the CloudFormation logical id for this path.
    pub fn logical_id(&self) -> String {
        let human: String = self
            .components
            .iter()
            .filter(|c| !HIDDEN_COMPONENTS.contains(&c.as_str()))
            .map(|c| sanitize(c))
            .collect();
        let hash = path_hash(&self.to_string());

        let max_human = MAX_LOGICAL_ID_LEN - HASH_LEN;
        let human = if human.len() > max_human {
            &human[..max_human]
        } else {
            human.as_str()
        };
        format!("{}{}", human, hash)
    }
}

impl std::fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

/// Strip everything but ASCII letters and digits.
pub fn sanitize(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// First eight uppercase hex digits of the MD5 of `input`.
pub fn path_hash(input: &str) -> String {
    let digest = md5::compute(input.as_bytes());
    let hex = format!("{:X}", digest);
    hex[..HASH_LEN].to_string()
}
