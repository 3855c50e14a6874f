//! Delivery stack: the CloudFront distribution in front of the website
//! bucket.

use tracing::debug;

use crate::app::App;
use crate::error::Result;
use crate::resources::cloudfront::{
    AllowedMethods, BehaviorOptions, CachePolicy, CachedMethods, Certificate, Distribution,
    DistributionProps, HttpVersion, OaiRef, PriceClass, S3BucketOrigin, SecurityPolicyProtocol,
    SslMethod, ViewerProtocolPolicy,
};
use crate::resources::s3::BucketRef;
use crate::stack::{Environment, Stack};
use crate::template::Output;

pub const DISTRIBUTION_ID: &str = "FrontendDistribution";

/// Inputs of a [`DeliveryStack`].
#[derive(Debug, Clone)]
pub struct DeliveryStackProps {
    pub price_class: PriceClass,
    /// Sign origin requests with this identity instead of reading the bucket
    /// through its public endpoint
    pub origin_access_identity: Option<OaiRef>,
    /// ACM certificate (in us-east-1) for `domain_names`
    pub certificate_arn: Option<String>,
    pub domain_names: Vec<String>,
}

impl Default for DeliveryStackProps {
    fn default() -> Self {
        Self {
            price_class: PriceClass::PriceClass100,
            origin_access_identity: None,
            certificate_arn: None,
            domain_names: Vec::new(),
        }
    }
}

/// Declared delivery stack.
#[derive(Debug, Clone)]
pub struct DeliveryStack {
    name: String,
    distribution_logical_id: String,
}

impl DeliveryStack {
    /// Declare the stack and add it to `app`. The bucket usually lives in
    /// another stack; the reference becomes an import at synthesis.
    pub fn new(
        app: &mut App,
        name: &str,
        environment: Environment,
        frontend_bucket: BucketRef,
        props: DeliveryStackProps,
    ) -> Result<Self> {
        let mut stack = Stack::new(name, environment)?;

        let origin = match props.origin_access_identity {
            Some(oai) => S3BucketOrigin::with_origin_access_identity(frontend_bucket, oai),
            None => S3BucketOrigin::new(frontend_bucket),
        };

        let mut distribution_props = DistributionProps::new(BehaviorOptions {
            origin,
            allowed_methods: AllowedMethods::AllowGetHeadOptions,
            cached_methods: CachedMethods::CacheGetHead,
            compress: true,
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            cache_policy: CachePolicy::CachingOptimized,
        });
        distribution_props.default_root_object = Some("index.html".to_string());
        distribution_props.price_class = props.price_class;
        distribution_props.enabled = true;
        distribution_props.http_version = HttpVersion::Http2And3;
        distribution_props.certificate = props.certificate_arn.map(Certificate::from_arn);
        distribution_props.domain_names = props.domain_names;
        distribution_props.ssl_support_method = SslMethod::Sni;
        distribution_props.minimum_protocol_version = SecurityPolicyProtocol::TlsV1_2_2021;

        let distribution = Distribution::new(&mut stack, DISTRIBUTION_ID, distribution_props)?;

        stack.add_output(
            "CloudFrontDistributionId",
            Output::new(distribution.distribution_id()),
        )?;
        stack.add_output(
            "CloudFrontDomainName",
            Output::new(distribution.domain_name()),
        )?;

        debug!(stack = %name, "Declared delivery stack");
        app.add_stack(stack)?;

        Ok(Self {
            name: name.to_string(),
            distribution_logical_id: distribution.logical_id().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn distribution_logical_id(&self) -> &str {
        &self.distribution_logical_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::storage::{StorageStack, StorageStackProps};
    use serde_json::{json, Value};

    fn env() -> Environment {
        Environment::new("180294218712", "us-east-1")
    }

    fn synth(props: DeliveryStackProps, private_origin: bool) -> (Value, Value) {
        let mut app = App::new();
        let storage = StorageStack::new(
            &mut app,
            "testpy-dev-s3",
            env(),
            StorageStackProps {
                prefix: "testpy-dev".into(),
                private_origin,
            },
        )
        .unwrap();
        let props = DeliveryStackProps {
            origin_access_identity: private_origin.then(|| storage.oai()),
            ..props
        };
        DeliveryStack::new(
            &mut app,
            "testpy-dev-cloudfront",
            env(),
            storage.frontend_bucket(),
            props,
        )
        .unwrap();

        let assembly = app.synth().unwrap();
        let storage = assembly.stack("testpy-dev-s3").unwrap().template.to_value().unwrap();
        let delivery = assembly
            .stack("testpy-dev-cloudfront")
            .unwrap()
            .template
            .to_value()
            .unwrap();
        (storage, delivery)
    }

    fn distribution_config(template: &Value) -> Value {
        template["Resources"]
            .as_object()
            .unwrap()
            .values()
            .find(|r| r["Type"] == "AWS::CloudFront::Distribution")
            .map(|r| r["Properties"]["DistributionConfig"].clone())
            .unwrap()
    }

    #[test]
    fn test_distribution_settings() {
        let (_, delivery) = synth(DeliveryStackProps::default(), false);
        let config = distribution_config(&delivery);

        assert_eq!(config["DefaultRootObject"], json!("index.html"));
        assert_eq!(config["PriceClass"], json!("PriceClass_100"));
        assert_eq!(config["Enabled"], json!(true));
        assert_eq!(config["HttpVersion"], json!("http2and3"));
        assert_eq!(
            config["DefaultCacheBehavior"]["CachePolicyId"],
            json!("658327ea-f89d-4fab-a63d-7e88639e58f6")
        );
        assert_eq!(config["DefaultCacheBehavior"]["Compress"], json!(true));
        assert_eq!(
            config["ViewerCertificate"],
            json!({"CloudFrontDefaultCertificate": true})
        );
    }

    #[test]
    fn test_origin_imports_bucket_domain() {
        let (storage, delivery) = synth(DeliveryStackProps::default(), false);
        let config = distribution_config(&delivery);

        let import = config["Origins"][0]["DomainName"]["Fn::ImportValue"]
            .as_str()
            .unwrap();
        let (producer, output_id) = import.split_once(':').unwrap();
        assert_eq!(producer, "testpy-dev-s3");
        assert_eq!(
            storage["Outputs"][output_id]["Export"]["Name"],
            json!(import)
        );
        assert_eq!(
            storage["Outputs"][output_id]["Value"]["Fn::GetAtt"][1],
            json!("RegionalDomainName")
        );
    }

    #[test]
    fn test_private_origin_uses_identity() {
        let (_, delivery) = synth(DeliveryStackProps::default(), true);
        let config = distribution_config(&delivery);
        let identity = &config["Origins"][0]["S3OriginConfig"]["OriginAccessIdentity"];
        assert_eq!(identity["Fn::Join"][1][0], json!("origin-access-identity/cloudfront/"));
        assert!(identity["Fn::Join"][1][1]["Fn::ImportValue"].is_string());
    }

    #[test]
    fn test_outputs() {
        let (_, delivery) = synth(DeliveryStackProps::default(), false);
        let outputs: Vec<&String> = delivery["Outputs"].as_object().unwrap().keys().collect();
        assert_eq!(outputs, vec!["CloudFrontDistributionId", "CloudFrontDomainName"]);
    }
}
