//! Storage stack: the website bucket and its origin access identity.

use tracing::debug;

use crate::app::App;
use crate::error::Result;
use crate::resources::cloudfront::{OaiRef, OriginAccessIdentity};
use crate::resources::iam::{PolicyStatement, Principal};
use crate::resources::s3::{BlockPublicAccess, Bucket, BucketProps, BucketRef, CorsRule, HttpMethods};
use crate::stack::{Environment, Stack};
use crate::template::{Output, RemovalPolicy};

pub const BUCKET_ID: &str = "FrontendBucket";
pub const OAI_ID: &str = "FrontendOAI";

pub const INDEX_DOCUMENT: &str = "index.html";
pub const ERROR_DOCUMENT: &str = "error.html";

/// Browser cache lifetime of CORS preflight responses, in seconds.
pub const CORS_MAX_AGE: u32 = 3000;

/// Inputs of a [`StorageStack`].
#[derive(Debug, Clone)]
pub struct StorageStackProps {
    /// Resource name prefix, e.g. `testpy-dev`
    pub prefix: String,
    /// Block all public access; the bucket is then only reachable through
    /// the origin access identity.
    pub private_origin: bool,
}

/// Declared storage stack.
#[derive(Debug, Clone)]
pub struct StorageStack {
    name: String,
    bucket: BucketRef,
    oai: OaiRef,
}

impl StorageStack {
    /// Declare the stack and add it to `app`.
    pub fn new(
        app: &mut App,
        name: &str,
        environment: Environment,
        props: StorageStackProps,
    ) -> Result<Self> {
        let mut stack = Stack::new(name, environment)?;
        let bucket_name = bucket_name(&props.prefix);

        let block_public_access = if props.private_origin {
            BlockPublicAccess::BLOCK_ALL
        } else {
            BlockPublicAccess::NONE
        };
        let mut bucket = Bucket::new(
            &mut stack,
            BUCKET_ID,
            BucketProps {
                bucket_name: Some(bucket_name.clone()),
                versioned: false,
                removal_policy: Some(RemovalPolicy::Destroy),
                auto_delete_objects: true,
                website_index_document: Some(INDEX_DOCUMENT.to_string()),
                website_error_document: Some(ERROR_DOCUMENT.to_string()),
                block_public_access: Some(block_public_access),
                cors: vec![frontend_cors_rule()],
            },
        )?;

        let oai = OriginAccessIdentity::new(
            &mut stack,
            OAI_ID,
            &format!("OAI for {}", bucket_name),
        )?;

        let statement = PolicyStatement::allow()
            .with_actions(["s3:*"])
            .with_principal(Principal::CanonicalUser(oai.s3_canonical_user_id()))
            .with_resources([bucket.arn(), bucket.arn_for_objects("*")]);
        bucket.add_to_resource_policy(&mut stack, statement)?;

        stack.add_output("FrontendBucketName", Output::new(bucket.name_expr()))?;
        stack.add_output("FrontendWebsiteURL", Output::new(bucket.website_url()))?;
        stack.add_output("OAIId", Output::new(oai.origin_access_identity_id()))?;
        stack.add_output(
            "OAICanonicalUserId",
            Output::new(oai.s3_canonical_user_id()),
        )?;

        debug!(stack = %name, bucket = %bucket_name, private_origin = props.private_origin, "Declared storage stack");
        app.add_stack(stack)?;

        Ok(Self {
            name: name.to_string(),
            bucket: bucket.to_ref(),
            oai: oai.to_ref(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the website bucket for other stacks.
    pub fn frontend_bucket(&self) -> BucketRef {
        self.bucket.clone()
    }

    /// Handle to the origin access identity for other stacks.
    pub fn oai(&self) -> OaiRef {
        self.oai.clone()
    }
}

/// Physical name of the website bucket.
pub fn bucket_name(prefix: &str) -> String {
    format!("{}-frontend", prefix)
}

fn frontend_cors_rule() -> CorsRule {
    CorsRule {
        allowed_headers: vec!["*".to_string()],
        allowed_methods: vec![
            HttpMethods::Get,
            HttpMethods::Put,
            HttpMethods::Post,
            HttpMethods::Delete,
            HttpMethods::Head,
        ],
        allowed_origins: vec!["*".to_string()],
        exposed_headers: vec!["ETag".to_string()],
        max_age: Some(CORS_MAX_AGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::auto_delete::RESOURCE_TYPE as AUTO_DELETE_TYPE;
    use serde_json::json;

    fn declare(private_origin: bool) -> (App, StorageStack) {
        let mut app = App::new();
        let storage = StorageStack::new(
            &mut app,
            "testpy-dev-s3",
            Environment::new("180294218712", "us-east-1"),
            StorageStackProps {
                prefix: "testpy-dev".to_string(),
                private_origin,
            },
        )
        .unwrap();
        (app, storage)
    }

    fn template(private_origin: bool) -> serde_json::Value {
        let (app, _) = declare(private_origin);
        app.stack("testpy-dev-s3")
            .unwrap()
            .to_template()
            .to_value()
            .unwrap()
    }

    fn of_type<'a>(template: &'a serde_json::Value, ty: &str) -> Vec<&'a serde_json::Value> {
        template["Resources"]
            .as_object()
            .unwrap()
            .values()
            .filter(|r| r["Type"] == ty)
            .collect()
    }

    #[test]
    fn test_bucket_properties() {
        let template = template(false);
        let buckets = of_type(&template, "AWS::S3::Bucket");
        assert_eq!(buckets.len(), 1);
        let bucket = buckets[0];

        assert_eq!(bucket["Properties"]["BucketName"], json!("testpy-dev-frontend"));
        assert_eq!(bucket["DeletionPolicy"], json!("Delete"));
        assert_eq!(bucket["UpdateReplacePolicy"], json!("Delete"));
        assert!(bucket["Properties"].get("VersioningConfiguration").is_none());
        assert_eq!(
            bucket["Properties"]["WebsiteConfiguration"],
            json!({"ErrorDocument": "error.html", "IndexDocument": "index.html"})
        );
        assert_eq!(
            bucket["Properties"]["PublicAccessBlockConfiguration"],
            json!({
                "BlockPublicAcls": false,
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": false,
                "RestrictPublicBuckets": false
            })
        );
        assert_eq!(
            bucket["Properties"]["CorsConfiguration"]["CorsRules"],
            json!([{
                "AllowedHeaders": ["*"],
                "AllowedMethods": ["GET", "PUT", "POST", "DELETE", "HEAD"],
                "AllowedOrigins": ["*"],
                "ExposedHeaders": ["ETag"],
                "MaxAge": 3000
            }])
        );
    }

    #[test]
    fn test_policy_grants_identity_and_provider() {
        let template = template(false);
        let policies = of_type(&template, "AWS::S3::BucketPolicy");
        assert_eq!(policies.len(), 1);

        let statements = policies[0]["Properties"]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 2);
        let oai_statement = statements
            .iter()
            .find(|s| s["Action"] == json!("s3:*"))
            .unwrap();
        assert_eq!(oai_statement["Effect"], json!("Allow"));
        assert!(oai_statement["Principal"]["CanonicalUser"]["Fn::GetAtt"][1]
            .as_str()
            .unwrap()
            .contains("S3CanonicalUserId"));
        assert_eq!(oai_statement["Resource"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_auto_delete_wiring() {
        let template = template(false);
        let custom = of_type(&template, AUTO_DELETE_TYPE);
        assert_eq!(custom.len(), 1);

        let policy_id = template["Resources"]
            .as_object()
            .unwrap()
            .iter()
            .find(|(_, r)| r["Type"] == "AWS::S3::BucketPolicy")
            .map(|(id, _)| id.clone())
            .unwrap();
        assert_eq!(custom[0]["DependsOn"], json!([policy_id]));
    }

    #[test]
    fn test_outputs() {
        let template = template(false);
        let outputs: Vec<&String> = template["Outputs"].as_object().unwrap().keys().collect();
        assert_eq!(
            outputs,
            vec![
                "FrontendBucketName",
                "FrontendWebsiteURL",
                "OAIId",
                "OAICanonicalUserId"
            ]
        );
        assert_eq!(
            template["Outputs"]["FrontendWebsiteURL"]["Value"]["Fn::GetAtt"][1],
            json!("WebsiteURL")
        );
    }

    #[test]
    fn test_oai_comment() {
        let template = template(false);
        let oai = of_type(&template, "AWS::CloudFront::CloudFrontOriginAccessIdentity");
        assert_eq!(
            oai[0]["Properties"]["CloudFrontOriginAccessIdentityConfig"]["Comment"],
            json!("OAI for testpy-dev-frontend")
        );
    }

    #[test]
    fn test_private_origin_blocks_public_access() {
        let template = template(true);
        let bucket = of_type(&template, "AWS::S3::Bucket")[0];
        assert_eq!(
            bucket["Properties"]["PublicAccessBlockConfiguration"]["BlockPublicPolicy"],
            json!(true)
        );
    }

    #[test]
    fn test_handles_point_at_stack() {
        let (_, storage) = declare(false);
        assert_eq!(storage.frontend_bucket().stack(), "testpy-dev-s3");
        assert_eq!(
            storage.frontend_bucket().bucket_name(),
            Some("testpy-dev-frontend")
        );
        assert_eq!(storage.oai().stack(), "testpy-dev-s3");
    }
}
