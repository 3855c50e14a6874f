//! Emptying buckets on stack teardown.
//!
//! CloudFormation refuses to delete a bucket that still holds objects. A
//! bucket declared with `auto_delete_objects` gets a custom resource whose
//! provider function lists and deletes every object version when the custom
//! resource is deleted, or empties the old bucket when an update renames it.
//! Only buckets carrying [`AUTO_DELETE_TAG`] are emptied. The custom resource depends on the bucket policy, so
//! during teardown CloudFormation empties the bucket while the provider role
//! still has access, then deletes the policy, then the bucket.
//!
//! One provider (role + function) is shared by all buckets of a stack.

use crate::construct::ConstructPath;
use crate::error::Result;
use crate::resources::iam::{managed_policy_arn, Principal, Role};
use crate::stack::Stack;
use crate::template::{Expr, RemovalPolicy, Resource};

/// Construct id of the per-stack provider.
pub const PROVIDER_ID: &str = "Custom::S3AutoDeleteObjectsCustomResourceProvider";

/// Resource type of the per-bucket custom resource.
pub const RESOURCE_TYPE: &str = "Custom::S3AutoDeleteObjects";

/// Tag marking buckets whose objects may be deleted by the provider.
pub const AUTO_DELETE_TAG: &str = "aws-cdk:auto-delete-objects";

/// Actions the provider role needs on the bucket.
pub const PROVIDER_ACTIONS: &[&str] = &[
    "s3:PutBucketPolicy",
    "s3:GetBucket*",
    "s3:List*",
    "s3:DeleteObject*",
];

const HANDLER_SOURCE: &str = include_str!("auto_delete_handler.js");
const HANDLER_RUNTIME: &str = "nodejs20.x";
const HANDLER_TIMEOUT_SECS: u32 = 900;
const HANDLER_MEMORY_MB: u32 = 128;

/// The provider function and the role it runs as.
#[derive(Debug, Clone)]
pub struct AutoDeleteObjectsProvider {
    role_arn: Expr,
    service_token: Expr,
}

impl AutoDeleteObjectsProvider {
    /// Return the stack's provider, declaring it on first use.
    pub fn get_or_create(stack: &mut Stack) -> Result<Self> {
        let base = ConstructPath::root(PROVIDER_ID)?;
        let role_path = base.child("Role")?;
        let handler_path = base.child("Handler")?;
        let role_id = role_path.logical_id();
        let handler_id = handler_path.logical_id();

        if !stack.has_resource(&handler_id) {
            let role = Role::new(
                stack,
                &role_path,
                Principal::Service("lambda.amazonaws.com".to_string()),
                vec![managed_policy_arn(
                    "service-role/AWSLambdaBasicExecutionRole",
                )],
            )?;

            let handler = Resource::new("AWS::Lambda::Function")
                .with_property("Code", Expr::object([("ZipFile", Expr::str(HANDLER_SOURCE))]))
                .with_property("Description", "Empties S3 buckets tagged for auto-deletion before the bucket is deleted.")
                .with_property("Handler", "index.handler")
                .with_property("MemorySize", HANDLER_MEMORY_MB)
                .with_property("Role", role.arn())
                .with_property("Runtime", HANDLER_RUNTIME)
                .with_property("Timeout", HANDLER_TIMEOUT_SECS)
                .depends_on(role.logical_id());
            stack.add_resource(&handler_path, handler)?;
        }

        Ok(Self {
            role_arn: Expr::get_att(role_id, "Arn"),
            service_token: Expr::get_att(handler_id, "Arn"),
        })
    }

    /// ARN of the role the provider runs as.
    pub fn role_arn(&self) -> Expr {
        self.role_arn.clone()
    }

    /// Declare the custom resource that empties `bucket_logical_id`.
    ///
    /// `policy_logical_id` is the bucket policy granting the provider role
    /// access; the custom resource must be deleted before it.
    pub fn add_bucket(
        &self,
        stack: &mut Stack,
        bucket_path: &ConstructPath,
        bucket_logical_id: &str,
        policy_logical_id: &str,
    ) -> Result<String> {
        let resource = Resource::new(RESOURCE_TYPE)
            .with_property("ServiceToken", self.service_token.clone())
            .with_property("BucketName", Expr::reference(bucket_logical_id))
            .depends_on(policy_logical_id)
            .with_removal_policy(RemovalPolicy::Destroy);
        stack.add_resource(&bucket_path.child("AutoDeleteObjectsCustomResource")?, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Environment;

    #[test]
    fn test_provider_is_declared_once() {
        let mut stack = Stack::new("s", Environment::new("1", "us-east-1")).unwrap();
        AutoDeleteObjectsProvider::get_or_create(&mut stack).unwrap();
        AutoDeleteObjectsProvider::get_or_create(&mut stack).unwrap();

        let functions = stack
            .resources()
            .values()
            .filter(|r| r.resource_type == "AWS::Lambda::Function")
            .count();
        let roles = stack
            .resources()
            .values()
            .filter(|r| r.resource_type == "AWS::IAM::Role")
            .count();
        assert_eq!(functions, 1);
        assert_eq!(roles, 1);
    }

    #[test]
    fn test_handler_deletes_on_delete_requests() {
        assert!(HANDLER_SOURCE.contains("RequestType === \"Delete\""));
        assert!(HANDLER_SOURCE.contains("DeleteObjectsCommand"));
    }

    #[test]
    fn test_handler_only_empties_tagged_buckets() {
        assert!(HANDLER_SOURCE.contains(&format!("\"{}\"", AUTO_DELETE_TAG)));
        assert!(HANDLER_SOURCE.contains("GetBucketTaggingCommand"));
        assert!(PROVIDER_ACTIONS.contains(&"s3:GetBucket*"));
    }

    #[test]
    fn test_handler_empties_renamed_bucket_on_update() {
        assert!(HANDLER_SOURCE.contains("RequestType === \"Update\""));
        assert!(HANDLER_SOURCE.contains("OldResourceProperties"));
    }

    #[test]
    fn test_custom_resource_depends_on_policy() {
        let mut stack = Stack::new("s", Environment::new("1", "us-east-1")).unwrap();
        let provider = AutoDeleteObjectsProvider::get_or_create(&mut stack).unwrap();
        let bucket_path = ConstructPath::root("Bucket").unwrap();
        let id = provider
            .add_bucket(&mut stack, &bucket_path, "Bucket1", "BucketPolicy1")
            .unwrap();

        let resource = stack.resource(&id).unwrap();
        assert_eq!(resource.resource_type, RESOURCE_TYPE);
        assert_eq!(resource.depends_on, vec!["BucketPolicy1".to_string()]);
        assert_eq!(resource.deletion_policy, Some(RemovalPolicy::Destroy));
    }
}
