//! Synthesis tests for the composed frontend app.
//!
//! These tests drive the library the way the CLI does: build an app from a
//! config and context, synthesize it and inspect the rendered templates.

use frontend_infra::app::{compose, App};
use frontend_infra::config::Config;
use frontend_infra::construct::ConstructPath;
use frontend_infra::error::Error;
use frontend_infra::stack::{Environment, Stack};
use frontend_infra::template::{Expr, Resource};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn synth_env(env: Option<&str>, config: &Config) -> Vec<(String, Value)> {
    let mut app = App::new();
    if let Some(env) = env {
        app.set_context("env", env);
    }
    compose(&mut app, config).unwrap();
    app.synth()
        .unwrap()
        .stacks()
        .iter()
        .map(|s| (s.name.clone(), s.template.to_value().unwrap()))
        .collect()
}

fn resources_of_type<'a>(template: &'a Value, ty: &str) -> Vec<&'a Value> {
    template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .filter(|r| r["Type"] == ty)
        .collect()
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_dev_is_default_environment() {
    let stacks = synth_env(None, &Config::default());
    let names: Vec<&str> = stacks.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["testpy-dev-s3", "testpy-dev-cloudfront"]);
}

#[test]
fn test_environment_from_context() {
    let stacks = synth_env(Some("prod"), &Config::default());
    let names: Vec<&str> = stacks.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["testpy-prod-s3", "testpy-prod-cloudfront"]);

    let bucket = resources_of_type(&stacks[0].1, "AWS::S3::Bucket")[0];
    assert_eq!(bucket["Properties"]["BucketName"], json!("testpy-prod-frontend"));
}

#[test]
fn test_storage_stack_contents() {
    let stacks = synth_env(None, &Config::default());
    let storage = &stacks[0].1;

    assert_eq!(resources_of_type(storage, "AWS::S3::Bucket").len(), 1);
    assert_eq!(resources_of_type(storage, "AWS::S3::BucketPolicy").len(), 1);
    assert_eq!(
        resources_of_type(storage, "AWS::CloudFront::CloudFrontOriginAccessIdentity").len(),
        1
    );
    assert_eq!(resources_of_type(storage, "Custom::S3AutoDeleteObjects").len(), 1);
    assert_eq!(resources_of_type(storage, "AWS::Lambda::Function").len(), 1);
    assert_eq!(resources_of_type(storage, "AWS::IAM::Role").len(), 1);

    let bucket = resources_of_type(storage, "AWS::S3::Bucket")[0];
    assert_eq!(bucket["DeletionPolicy"], json!("Delete"));
    assert_eq!(
        bucket["Properties"]["Tags"],
        json!([{"Key": "aws-cdk:auto-delete-objects", "Value": "true"}])
    );
}

#[test]
fn test_delivery_stack_contents() {
    let stacks = synth_env(None, &Config::default());
    let delivery = &stacks[1].1;

    let distributions = resources_of_type(delivery, "AWS::CloudFront::Distribution");
    assert_eq!(distributions.len(), 1);

    let config = &distributions[0]["Properties"]["DistributionConfig"];
    assert_eq!(config["DefaultRootObject"], json!("index.html"));
    assert_eq!(config["PriceClass"], json!("PriceClass_100"));
    assert_eq!(
        config["DefaultCacheBehavior"]["ViewerProtocolPolicy"],
        json!("redirect-to-https")
    );
    assert_eq!(config["Origins"].as_array().unwrap().len(), 1);
    assert_eq!(
        config["Origins"][0]["Id"],
        config["DefaultCacheBehavior"]["TargetOriginId"]
    );
}

#[test]
fn test_resources_carry_construct_path() {
    let stacks = synth_env(None, &Config::default());
    for (name, template) in &stacks {
        for resource in template["Resources"].as_object().unwrap().values() {
            let path = resource["Metadata"]["aws:cdk:path"].as_str().unwrap();
            assert!(path.starts_with(&format!("{}/", name)), "{}", path);
        }
    }
}

// ============================================================================
// Cross-stack wiring
// ============================================================================

#[test]
fn test_delivery_imports_storage_exports() {
    let stacks = synth_env(None, &Config::default());
    let (storage, delivery) = (&stacks[0].1, &stacks[1].1);

    let exports: Vec<String> = storage["Outputs"]
        .as_object()
        .unwrap()
        .values()
        .filter_map(|o| o["Export"]["Name"].as_str().map(str::to_string))
        .collect();
    assert!(!exports.is_empty());

    let rendered = delivery.to_string();
    for export in &exports {
        assert!(export.starts_with("testpy-dev-s3:"));
        assert!(rendered.contains(export.as_str()), "{} not imported", export);
    }
}

#[test]
fn test_private_origin_reads_identity_from_storage() {
    let mut config = Config::default();
    config.delivery.private_origin = true;
    let stacks = synth_env(None, &config);
    let (storage, delivery) = (&stacks[0].1, &stacks[1].1);

    let bucket = resources_of_type(storage, "AWS::S3::Bucket")[0];
    assert_eq!(
        bucket["Properties"]["PublicAccessBlockConfiguration"]["RestrictPublicBuckets"],
        json!(true)
    );

    let distribution = resources_of_type(delivery, "AWS::CloudFront::Distribution")[0];
    let identity = &distribution["Properties"]["DistributionConfig"]["Origins"][0]
        ["S3OriginConfig"]["OriginAccessIdentity"];
    let import = identity["Fn::Join"][1][1]["Fn::ImportValue"].as_str().unwrap();
    let output_id = import.strip_prefix("testpy-dev-s3:").unwrap();
    assert_eq!(storage["Outputs"][output_id]["Export"]["Name"], json!(import));
}

#[test]
fn test_custom_certificate() {
    let mut config = Config::default();
    config.delivery.certificate_arn =
        Some("arn:aws:acm:us-east-1:180294218712:certificate/abc".to_string());
    config.delivery.domain_names = vec!["www.example.com".to_string()];
    let stacks = synth_env(None, &config);

    let distribution = resources_of_type(&stacks[1].1, "AWS::CloudFront::Distribution")[0];
    let config = &distribution["Properties"]["DistributionConfig"];
    assert_eq!(config["Aliases"], json!(["www.example.com"]));
    assert_eq!(
        config["ViewerCertificate"]["AcmCertificateArn"],
        json!("arn:aws:acm:us-east-1:180294218712:certificate/abc")
    );
    assert_eq!(config["ViewerCertificate"]["SslSupportMethod"], json!("sni-only"));
}

#[test]
fn test_certificate_outside_us_east_1_is_rejected() {
    let mut config = Config::default();
    config.delivery.certificate_arn =
        Some("arn:aws:acm:eu-west-1:180294218712:certificate/abc".to_string());
    let mut app = App::new();
    assert!(matches!(
        compose(&mut app, &config),
        Err(Error::InvalidProps { .. })
    ));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_synthesis_is_deterministic() {
    let first = synth_env(Some("qa"), &Config::default());
    let second = synth_env(Some("qa"), &Config::default());
    assert_eq!(first, second);
}

#[test]
fn test_repeated_synth_of_one_app() {
    let mut app = App::new();
    compose(&mut app, &Config::default()).unwrap();
    let first = app.synth().unwrap();
    let second = app.synth().unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_compose_twice_is_duplicate_stack() {
    let mut app = App::new();
    compose(&mut app, &Config::default()).unwrap();
    assert!(matches!(
        compose(&mut app, &Config::default()),
        Err(Error::DuplicateStack(_))
    ));
}

#[test]
fn test_invalid_environment_name() {
    let mut app = App::new();
    app.set_context("env", "Bad_Env");
    assert!(compose(&mut app, &Config::default()).is_err());
}

#[test]
fn test_mutual_references_are_a_cycle() {
    let env = Environment::new("180294218712", "us-east-1");
    let path = ConstructPath::root("Bucket").unwrap();
    let mut left = Stack::new("left", env.clone()).unwrap();
    let mut right = Stack::new("right", env).unwrap();
    let left_id = path.logical_id();
    let right_id = path.logical_id();

    left.add_resource(
        &path,
        Resource::new("AWS::S3::Bucket").with_property(
            "Tags",
            Expr::imported("right", Expr::reference(&right_id)),
        ),
    )
    .unwrap();
    right
        .add_resource(
            &path,
            Resource::new("AWS::S3::Bucket").with_property(
                "Tags",
                Expr::imported("left", Expr::reference(&left_id)),
            ),
        )
        .unwrap();

    let mut app = App::new();
    app.add_stack(left).unwrap();
    app.add_stack(right).unwrap();

    match app.synth() {
        Err(Error::DependencyCycle(cycle)) => {
            assert_eq!(cycle.first(), cycle.last());
            assert!(cycle.contains(&"left".to_string()));
            assert!(cycle.contains(&"right".to_string()));
        }
        other => panic!("expected a dependency cycle, got {:?}", other),
    }
}

#[test]
fn test_cross_environment_reference_is_rejected() {
    let path = ConstructPath::root("Bucket").unwrap();
    let mut producer =
        Stack::new("producer", Environment::new("180294218712", "us-east-1")).unwrap();
    let bucket = producer
        .add_resource(&path, Resource::new("AWS::S3::Bucket"))
        .unwrap();
    let mut consumer =
        Stack::new("consumer", Environment::new("180294218712", "eu-west-1")).unwrap();
    consumer
        .add_resource(
            &path,
            Resource::new("AWS::S3::Bucket").with_property(
                "Tags",
                Expr::imported("producer", Expr::get_att(&bucket, "Arn")),
            ),
        )
        .unwrap();

    let mut app = App::new();
    app.add_stack(producer).unwrap();
    app.add_stack(consumer).unwrap();
    assert!(matches!(
        app.synth(),
        Err(Error::InvalidCrossStackReference { .. })
    ));
}
