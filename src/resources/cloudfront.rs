//! CloudFront distributions and origin access identities.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::construct::ConstructPath;
use crate::error::{Error, Result};
use crate::resources::s3::BucketRef;
use crate::stack::Stack;
use crate::template::{Expr, Resource};

/// CloudFront only accepts ACM certificates from this region.
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Longest comment CloudFront accepts on an origin access identity.
const MAX_OAI_COMMENT_LEN: usize = 128;

/// Edge locations a distribution is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceClass {
    /// North America and Europe only
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
    /// Adds Asia, Middle East and Africa
    #[serde(rename = "PriceClass_200")]
    PriceClass200,
    /// Every edge location
    #[serde(rename = "PriceClass_All")]
    PriceClassAll,
}

impl PriceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceClass::PriceClass100 => "PriceClass_100",
            PriceClass::PriceClass200 => "PriceClass_200",
            PriceClass::PriceClassAll => "PriceClass_All",
        }
    }
}

impl Default for PriceClass {
    fn default() -> Self {
        Self::PriceClassAll
    }
}

/// HTTP versions viewers may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http1_1,
    Http2,
    Http2And3,
    Http3,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http1_1 => "http1.1",
            HttpVersion::Http2 => "http2",
            HttpVersion::Http2And3 => "http2and3",
            HttpVersion::Http3 => "http3",
        }
    }
}

/// Methods CloudFront forwards to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedMethods {
    AllowGetHead,
    AllowGetHeadOptions,
    AllowAll,
}

impl AllowedMethods {
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            AllowedMethods::AllowGetHead => &["GET", "HEAD"],
            AllowedMethods::AllowGetHeadOptions => &["GET", "HEAD", "OPTIONS"],
            AllowedMethods::AllowAll => &["GET", "HEAD", "OPTIONS", "PUT", "PATCH", "POST", "DELETE"],
        }
    }
}

/// Methods whose responses CloudFront caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedMethods {
    CacheGetHead,
    CacheGetHeadOptions,
}

impl CachedMethods {
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            CachedMethods::CacheGetHead => &["GET", "HEAD"],
            CachedMethods::CacheGetHeadOptions => &["GET", "HEAD", "OPTIONS"],
        }
    }
}

/// What viewers may do over plain HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerProtocolPolicy {
    AllowAll,
    HttpsOnly,
    RedirectToHttps,
}

impl ViewerProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerProtocolPolicy::AllowAll => "allow-all",
            ViewerProtocolPolicy::HttpsOnly => "https-only",
            ViewerProtocolPolicy::RedirectToHttps => "redirect-to-https",
        }
    }
}

/// AWS managed cache policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    CachingOptimized,
    CachingOptimizedForUncompressedObjects,
    CachingDisabled,
}

impl CachePolicy {
    /// The managed policy id.
    pub fn id(&self) -> &'static str {
        match self {
            CachePolicy::CachingOptimized => "658327ea-f89d-4fab-a63d-7e88639e58f6",
            CachePolicy::CachingOptimizedForUncompressedObjects => {
                "b2884449-e4de-46a7-ac36-70bc7f1ddd6d"
            }
            CachePolicy::CachingDisabled => "4135ea2d-6df8-44a3-9df3-4b5a84be39ad",
        }
    }
}

/// How CloudFront serves HTTPS with a custom certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMethod {
    Sni,
    Vip,
}

impl SslMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMethod::Sni => "sni-only",
            SslMethod::Vip => "vip",
        }
    }
}

/// Minimum TLS security policy for viewer connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPolicyProtocol {
    SslV3,
    TlsV1,
    TlsV1_2016,
    TlsV1_1_2016,
    TlsV1_2_2018,
    TlsV1_2_2019,
    TlsV1_2_2021,
}

impl SecurityPolicyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityPolicyProtocol::SslV3 => "SSLv3",
            SecurityPolicyProtocol::TlsV1 => "TLSv1",
            SecurityPolicyProtocol::TlsV1_2016 => "TLSv1_2016",
            SecurityPolicyProtocol::TlsV1_1_2016 => "TLSv1.1_2016",
            SecurityPolicyProtocol::TlsV1_2_2018 => "TLSv1.2_2018",
            SecurityPolicyProtocol::TlsV1_2_2019 => "TLSv1.2_2019",
            SecurityPolicyProtocol::TlsV1_2_2021 => "TLSv1.2_2021",
        }
    }
}

/// A CloudFront origin access identity.
#[derive(Debug, Clone)]
pub struct OriginAccessIdentity {
    stack: String,
    logical_id: String,
}

impl OriginAccessIdentity {
    /// Declare an identity. Comments longer than CloudFront allows are cut.
    pub fn new(stack: &mut Stack, id: &str, comment: &str) -> Result<Self> {
        let comment: String = comment.chars().take(MAX_OAI_COMMENT_LEN).collect();
        let resource = Resource::new("AWS::CloudFront::CloudFrontOriginAccessIdentity")
            .with_property(
                "CloudFrontOriginAccessIdentityConfig",
                Expr::object([("Comment", Expr::str(comment))]),
            );
        let logical_id = stack.add_resource(&ConstructPath::root(id)?, resource)?;
        Ok(Self {
            stack: stack.name().to_string(),
            logical_id,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The identity id, e.g. `E15MNIMTCFKK4C`.
    pub fn origin_access_identity_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Canonical user id to grant S3 permissions to.
    pub fn s3_canonical_user_id(&self) -> Expr {
        Expr::get_att(&self.logical_id, "S3CanonicalUserId")
    }

    pub fn to_ref(&self) -> OaiRef {
        OaiRef {
            stack: self.stack.clone(),
            logical_id: self.logical_id.clone(),
        }
    }
}

/// A reference to an origin access identity declared in some stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiRef {
    stack: String,
    logical_id: String,
}

impl OaiRef {
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn origin_access_identity_id(&self) -> Expr {
        Expr::imported(&self.stack, Expr::reference(&self.logical_id))
    }

    pub fn s3_canonical_user_id(&self) -> Expr {
        Expr::imported(
            &self.stack,
            Expr::get_att(&self.logical_id, "S3CanonicalUserId"),
        )
    }
}

/// How the distribution reaches the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginAccess {
    /// The bucket is readable without credentials.
    Public,
    /// Requests are signed with an origin access identity.
    Identity(OaiRef),
}

/// A bucket used as a distribution origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3BucketOrigin {
    bucket: BucketRef,
    access: OriginAccess,
}

impl S3BucketOrigin {
    /// Reach the bucket through its public endpoint.
    pub fn new(bucket: BucketRef) -> Self {
        Self {
            bucket,
            access: OriginAccess::Public,
        }
    }

    /// Reach the bucket through an origin access identity.
    pub fn with_origin_access_identity(bucket: BucketRef, oai: OaiRef) -> Self {
        Self {
            bucket,
            access: OriginAccess::Identity(oai),
        }
    }

    fn render(&self, origin_id: &str) -> Expr {
        let identity = match &self.access {
            OriginAccess::Public => Expr::str(""),
            OriginAccess::Identity(oai) => Expr::join(
                "",
                vec![
                    Expr::str("origin-access-identity/cloudfront/"),
                    oai.origin_access_identity_id(),
                ],
            ),
        };
        Expr::object([
            ("DomainName", self.bucket.regional_domain_name()),
            ("Id", Expr::str(origin_id)),
            (
                "S3OriginConfig",
                Expr::object([("OriginAccessIdentity", identity)]),
            ),
        ])
    }
}

/// Settings of the default cache behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorOptions {
    pub origin: S3BucketOrigin,
    pub allowed_methods: AllowedMethods,
    pub cached_methods: CachedMethods,
    pub compress: bool,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub cache_policy: CachePolicy,
}

impl BehaviorOptions {
    /// Behavior with the service defaults for everything but the origin.
    pub fn new(origin: S3BucketOrigin) -> Self {
        Self {
            origin,
            allowed_methods: AllowedMethods::AllowGetHead,
            cached_methods: CachedMethods::CacheGetHead,
            compress: true,
            viewer_protocol_policy: ViewerProtocolPolicy::AllowAll,
            cache_policy: CachePolicy::CachingOptimized,
        }
    }

    fn render(&self, origin_id: &str) -> Expr {
        Expr::object([
            ("AllowedMethods", Expr::str_list(self.allowed_methods.methods())),
            ("CachePolicyId", Expr::str(self.cache_policy.id())),
            ("CachedMethods", Expr::str_list(self.cached_methods.methods())),
            ("Compress", Expr::from(self.compress)),
            ("TargetOriginId", Expr::str(origin_id)),
            (
                "ViewerProtocolPolicy",
                Expr::str(self.viewer_protocol_policy.as_str()),
            ),
        ])
    }
}

/// An ACM certificate for custom domain names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub arn: String,
}

impl Certificate {
    pub fn from_arn(arn: impl Into<String>) -> Self {
        Self { arn: arn.into() }
    }

    /// Region segment of the ARN (`arn:aws:acm:<region>:...`).
    fn region(&self) -> Option<&str> {
        self.arn.split(':').nth(3)
    }
}

/// Properties of a [`Distribution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionProps {
    pub default_behavior: BehaviorOptions,
    pub default_root_object: Option<String>,
    pub price_class: PriceClass,
    pub enabled: bool,
    pub http_version: HttpVersion,
    pub enable_ipv6: bool,
    pub comment: Option<String>,
    /// Without a certificate the CloudFront default certificate is used
    pub certificate: Option<Certificate>,
    pub domain_names: Vec<String>,
    pub ssl_support_method: SslMethod,
    pub minimum_protocol_version: SecurityPolicyProtocol,
}

impl DistributionProps {
    pub fn new(default_behavior: BehaviorOptions) -> Self {
        Self {
            default_behavior,
            default_root_object: None,
            price_class: PriceClass::default(),
            enabled: true,
            http_version: HttpVersion::Http2,
            enable_ipv6: true,
            comment: None,
            certificate: None,
            domain_names: Vec::new(),
            ssl_support_method: SslMethod::Sni,
            minimum_protocol_version: SecurityPolicyProtocol::TlsV1_2_2021,
        }
    }
}

/// A declared CloudFront distribution.
#[derive(Debug, Clone)]
pub struct Distribution {
    logical_id: String,
    origin_id: String,
    props: DistributionProps,
}

impl Distribution {
    pub fn new(stack: &mut Stack, id: &str, props: DistributionProps) -> Result<Self> {
        let path = ConstructPath::root(id)?;
        validate_props(&path, &props)?;

        let origin_id = path.child("Origin1")?.logical_id();
        let mut config: Vec<(&str, Expr)> = Vec::new();
        if !props.domain_names.is_empty() {
            config.push(("Aliases", Expr::str_list(&props.domain_names)));
        }
        if let Some(comment) = &props.comment {
            config.push(("Comment", Expr::str(comment.as_str())));
        }
        config.push((
            "DefaultCacheBehavior",
            props.default_behavior.render(&origin_id),
        ));
        if let Some(root) = &props.default_root_object {
            config.push(("DefaultRootObject", Expr::str(root.as_str())));
        }
        config.push(("Enabled", Expr::from(props.enabled)));
        config.push(("HttpVersion", Expr::str(props.http_version.as_str())));
        config.push(("IPV6Enabled", Expr::from(props.enable_ipv6)));
        config.push((
            "Origins",
            Expr::List(vec![props.default_behavior.origin.render(&origin_id)]),
        ));
        config.push(("PriceClass", Expr::str(props.price_class.as_str())));
        config.push(("ViewerCertificate", viewer_certificate(&path, &props)));

        let resource = Resource::new("AWS::CloudFront::Distribution")
            .with_property("DistributionConfig", Expr::object(config));
        let logical_id = stack.add_resource(&path, resource)?;

        Ok(Self {
            logical_id,
            origin_id,
            props,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Id of the single origin, also the default behavior's target.
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    pub fn props(&self) -> &DistributionProps {
        &self.props
    }

    /// The distribution id, e.g. `E2QWRUHAPOMQZL`.
    pub fn distribution_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// The `*.cloudfront.net` domain name.
    pub fn domain_name(&self) -> Expr {
        Expr::get_att(&self.logical_id, "DomainName")
    }
}

fn validate_props(path: &ConstructPath, props: &DistributionProps) -> Result<()> {
    if !props.domain_names.is_empty() && props.certificate.is_none() {
        return Err(Error::invalid_props(
            path.to_string(),
            "a certificate is required when domain names are given",
        ));
    }
    if let Some(certificate) = &props.certificate {
        if certificate.region() != Some(CERTIFICATE_REGION) {
            return Err(Error::invalid_props(
                path.to_string(),
                format!(
                    "distribution certificates must be in the {} region, got '{}'",
                    CERTIFICATE_REGION, certificate.arn
                ),
            ));
        }
    }
    if let Some(root) = &props.default_root_object {
        if root.starts_with('/') {
            return Err(Error::invalid_props(
                path.to_string(),
                "the default root object must not start with '/'",
            ));
        }
    }
    Ok(())
}

/// With the default certificate CloudFront decides the TLS policy itself, so
/// the SNI and minimum protocol settings only apply to custom certificates.
fn viewer_certificate(path: &ConstructPath, props: &DistributionProps) -> Expr {
    match &props.certificate {
        Some(certificate) => Expr::object([
            ("AcmCertificateArn", Expr::str(certificate.arn.as_str())),
            (
                "MinimumProtocolVersion",
                Expr::str(props.minimum_protocol_version.as_str()),
            ),
            ("SslSupportMethod", Expr::str(props.ssl_support_method.as_str())),
        ]),
        None => {
            warn!(
                distribution = %path,
                ssl_support_method = props.ssl_support_method.as_str(),
                minimum_protocol_version = props.minimum_protocol_version.as_str(),
                "Using the CloudFront default certificate; TLS settings apply to custom certificates only"
            );
            Expr::object([("CloudFrontDefaultCertificate", Expr::from(true))])
        }
    }
}
