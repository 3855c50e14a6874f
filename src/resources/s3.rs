//! S3 buckets and bucket policies.
//!
//! [`Bucket`] declares an `AWS::S3::Bucket` plus whatever it needs alongside:
//! a bucket policy once statements are added, and the auto-delete custom
//! resource when objects should be removed on teardown.
//!
//! # Example
//!
//! ```rust,ignore
//! let bucket = Bucket::new(&mut stack, "FrontendBucket", BucketProps {
//!     bucket_name: Some("testpy-dev-frontend".into()),
//!     removal_policy: Some(RemovalPolicy::Destroy),
//!     auto_delete_objects: true,
//!     website_index_document: Some("index.html".into()),
//!     ..Default::default()
//! })?;
//! ```

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::construct::ConstructPath;
use crate::error::{Error, Result};
use crate::resources::auto_delete::{AutoDeleteObjectsProvider, AUTO_DELETE_TAG, PROVIDER_ACTIONS};
use crate::resources::iam::{PolicyDocument, PolicyStatement, Principal};
use crate::stack::Stack;
use crate::template::{Expr, RemovalPolicy, Resource};

static BUCKET_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9.-]+$").expect("Invalid bucket name regex"));

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Validate a bucket name against the S3 naming rules.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(Error::invalid_bucket_name(
            name,
            format!(
                "must be between {} and {} characters long (got {})",
                MIN_BUCKET_NAME_LEN, MAX_BUCKET_NAME_LEN, len
            ),
        ));
    }
    if !BUCKET_NAME_CHARS.is_match(name) {
        return Err(Error::invalid_bucket_name(
            name,
            "must only contain lowercase letters, digits, periods and hyphens",
        ));
    }
    let first_last_ok = |c: Option<char>| c.map_or(false, |c| c.is_ascii_alphanumeric());
    if !first_last_ok(name.chars().next()) || !first_last_ok(name.chars().last()) {
        return Err(Error::invalid_bucket_name(
            name,
            "must start and end with a lowercase letter or digit",
        ));
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(Error::invalid_bucket_name(
            name,
            "must not contain consecutive periods or a period next to a hyphen",
        ));
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(Error::invalid_bucket_name(
            name,
            "must not be formatted as an IP address",
        ));
    }
    Ok(())
}

/// HTTP methods a CORS rule can allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethods {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl HttpMethods {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethods::Get => "GET",
            HttpMethods::Put => "PUT",
            HttpMethods::Post => "POST",
            HttpMethods::Delete => "DELETE",
            HttpMethods::Head => "HEAD",
        }
    }
}

/// A cross-origin resource sharing rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorsRule {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<HttpMethods>,
    pub allowed_origins: Vec<String>,
    pub exposed_headers: Vec<String>,
    /// Seconds browsers may cache the preflight response
    pub max_age: Option<u32>,
}

impl CorsRule {
    fn to_expr(&self) -> Expr {
        let mut entries: Vec<(&str, Expr)> = Vec::new();
        if !self.allowed_headers.is_empty() {
            entries.push(("AllowedHeaders", Expr::str_list(&self.allowed_headers)));
        }
        let methods: Vec<&str> = self.allowed_methods.iter().map(HttpMethods::as_str).collect();
        entries.push(("AllowedMethods", Expr::str_list(&methods)));
        entries.push(("AllowedOrigins", Expr::str_list(&self.allowed_origins)));
        if !self.exposed_headers.is_empty() {
            entries.push(("ExposedHeaders", Expr::str_list(&self.exposed_headers)));
        }
        if let Some(max_age) = self.max_age {
            entries.push(("MaxAge", Expr::from(max_age)));
        }
        Expr::object(entries)
    }
}

/// The four public access block switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPublicAccess {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl BlockPublicAccess {
    /// Every switch on: no public access at all.
    pub const BLOCK_ALL: Self = Self {
        block_public_acls: true,
        block_public_policy: true,
        ignore_public_acls: true,
        restrict_public_buckets: true,
    };

    /// Every switch off: public ACLs and policies are honored.
    pub const NONE: Self = Self {
        block_public_acls: false,
        block_public_policy: false,
        ignore_public_acls: false,
        restrict_public_buckets: false,
    };

    fn to_expr(self) -> Expr {
        Expr::object([
            ("BlockPublicAcls", Expr::from(self.block_public_acls)),
            ("BlockPublicPolicy", Expr::from(self.block_public_policy)),
            ("IgnorePublicAcls", Expr::from(self.ignore_public_acls)),
            ("RestrictPublicBuckets", Expr::from(self.restrict_public_buckets)),
        ])
    }
}

/// Properties of a [`Bucket`].
#[derive(Debug, Clone, Default)]
pub struct BucketProps {
    /// Physical name; generated by CloudFormation when absent
    pub bucket_name: Option<String>,
    pub versioned: bool,
    /// Defaults to [`RemovalPolicy::Retain`]
    pub removal_policy: Option<RemovalPolicy>,
    /// Empty the bucket when it is deleted; requires `RemovalPolicy::Destroy`
    pub auto_delete_objects: bool,
    pub website_index_document: Option<String>,
    pub website_error_document: Option<String>,
    pub block_public_access: Option<BlockPublicAccess>,
    pub cors: Vec<CorsRule>,
}

/// A declared S3 bucket.
#[derive(Debug, Clone)]
pub struct Bucket {
    stack: String,
    path: ConstructPath,
    logical_id: String,
    bucket_name: Option<String>,
    website: bool,
    policy: Option<BucketPolicy>,
}

#[derive(Debug, Clone)]
struct BucketPolicy {
    logical_id: String,
    document: PolicyDocument,
}

impl Bucket {
    /// Declare a bucket in `stack`.
    pub fn new(stack: &mut Stack, id: &str, props: BucketProps) -> Result<Self> {
        let path = ConstructPath::root(id)?;
        let removal_policy = props.removal_policy.unwrap_or(RemovalPolicy::Retain);

        if let Some(name) = &props.bucket_name {
            validate_bucket_name(name)?;
        }
        if props.auto_delete_objects && removal_policy != RemovalPolicy::Destroy {
            return Err(Error::invalid_props(
                path.to_string(),
                "auto_delete_objects requires the removal policy to be Destroy",
            ));
        }
        if props.website_error_document.is_some() && props.website_index_document.is_none() {
            return Err(Error::invalid_props(
                path.to_string(),
                "a website error document requires an index document",
            ));
        }

        let mut resource = Resource::new("AWS::S3::Bucket")
            .with_optional_property("BucketName", props.bucket_name.clone());
        if !props.cors.is_empty() {
            resource = resource.with_property(
                "CorsConfiguration",
                Expr::object([(
                    "CorsRules",
                    Expr::List(props.cors.iter().map(CorsRule::to_expr).collect()),
                )]),
            );
        }
        if let Some(block) = props.block_public_access {
            resource = resource.with_property("PublicAccessBlockConfiguration", block.to_expr());
        }
        if props.auto_delete_objects {
            resource = resource.with_property(
                "Tags",
                Expr::List(vec![Expr::object([
                    ("Key", Expr::str(AUTO_DELETE_TAG)),
                    ("Value", Expr::str("true")),
                ])]),
            );
        }
        if props.versioned {
            resource = resource.with_property(
                "VersioningConfiguration",
                Expr::object([("Status", Expr::str("Enabled"))]),
            );
        }
        let website = props.website_index_document.is_some();
        if let Some(index) = &props.website_index_document {
            let mut website_config = vec![("IndexDocument", Expr::str(index.as_str()))];
            if let Some(error) = &props.website_error_document {
                website_config.insert(0, ("ErrorDocument", Expr::str(error.as_str())));
            }
            resource = resource.with_property("WebsiteConfiguration", Expr::object(website_config));
        }
        resource = resource.with_removal_policy(removal_policy);

        let logical_id = stack.add_resource(&path, resource)?;
        let mut bucket = Self {
            stack: stack.name().to_string(),
            path,
            logical_id,
            bucket_name: props.bucket_name,
            website,
            policy: None,
        };

        if props.auto_delete_objects {
            let provider = AutoDeleteObjectsProvider::get_or_create(stack)?;
            let statement = PolicyStatement::allow()
                .with_actions(PROVIDER_ACTIONS.iter().copied())
                .with_principal(Principal::Aws(provider.role_arn()))
                .with_resources([bucket.arn(), bucket.arn_for_objects("*")]);
            let policy_id = bucket.add_to_resource_policy(stack, statement)?;
            provider.add_bucket(stack, &bucket.path, &bucket.logical_id, &policy_id)?;
        }

        Ok(bucket)
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The literal bucket name, when one was given.
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }

    /// `Ref` of the bucket: its name.
    pub fn name_expr(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    pub fn arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// ARN of the objects matching `pattern`, e.g. `*`.
    pub fn arn_for_objects(&self, pattern: &str) -> Expr {
        Expr::join("", vec![self.arn(), Expr::str(format!("/{}", pattern))])
    }

    pub fn website_url(&self) -> Expr {
        Expr::get_att(&self.logical_id, "WebsiteURL")
    }

    pub fn regional_domain_name(&self) -> Expr {
        Expr::get_att(&self.logical_id, "RegionalDomainName")
    }

    pub fn is_website(&self) -> bool {
        self.website
    }

    /// Add a statement to the bucket policy, declaring the policy on first
    /// use. Returns the policy's logical id.
    pub fn add_to_resource_policy(
        &mut self,
        stack: &mut Stack,
        statement: PolicyStatement,
    ) -> Result<String> {
        if self.policy.is_none() {
            let resource = Resource::new("AWS::S3::BucketPolicy")
                .with_property("Bucket", self.name_expr())
                .with_property("PolicyDocument", PolicyDocument::new().to_expr());
            let logical_id = stack.add_resource(&self.path.child("Policy")?, resource)?;
            self.policy = Some(BucketPolicy {
                logical_id,
                document: PolicyDocument::new(),
            });
        }

        let policy = self
            .policy
            .as_mut()
            .ok_or_else(|| Error::invalid_props(self.path.to_string(), "bucket policy missing"))?;
        policy.document.add_statement(statement);

        let resource = stack.resource_mut(&policy.logical_id).ok_or_else(|| {
            Error::UnresolvedReference {
                stack: self.stack.clone(),
                logical_id: policy.logical_id.clone(),
            }
        })?;
        resource
            .properties
            .insert("PolicyDocument".to_string(), policy.document.to_expr());
        Ok(policy.logical_id.clone())
    }

    /// A handle other stacks can hold on to.
    pub fn to_ref(&self) -> BucketRef {
        BucketRef {
            stack: self.stack.clone(),
            logical_id: self.logical_id.clone(),
            bucket_name: self.bucket_name.clone(),
        }
    }
}

/// A reference to a bucket declared in some stack.
///
/// Every expression returned from here is tagged with the owning stack; the
/// app turns them into imports when they are used elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRef {
    stack: String,
    logical_id: String,
    bucket_name: Option<String>,
}

impl BucketRef {
    /// Name of the stack that owns the bucket.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }

    fn owned(&self, value: Expr) -> Expr {
        Expr::imported(&self.stack, value)
    }

    pub fn name_expr(&self) -> Expr {
        self.owned(Expr::reference(&self.logical_id))
    }

    pub fn arn(&self) -> Expr {
        self.owned(Expr::get_att(&self.logical_id, "Arn"))
    }

    pub fn regional_domain_name(&self) -> Expr {
        self.owned(Expr::get_att(&self.logical_id, "RegionalDomainName"))
    }

    pub fn website_url(&self) -> Expr {
        self.owned(Expr::get_att(&self.logical_id, "WebsiteURL"))
    }
}
