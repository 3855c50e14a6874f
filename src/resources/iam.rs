//! IAM policy documents and roles.

use crate::construct::ConstructPath;
use crate::error::Result;
use crate::stack::Stack;
use crate::template::{Expr, Resource};

/// Version string every policy document carries.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Whether a statement allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Who a statement applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// An S3 canonical user id, as issued to CloudFront origin access
    /// identities.
    CanonicalUser(Expr),
    /// An IAM ARN or account.
    Aws(Expr),
    /// An AWS service such as `lambda.amazonaws.com`.
    Service(String),
    /// Everyone.
    Any,
}

impl Principal {
    fn key(&self) -> Option<&'static str> {
        match self {
            Principal::CanonicalUser(_) => Some("CanonicalUser"),
            Principal::Aws(_) => Some("AWS"),
            Principal::Service(_) => Some("Service"),
            Principal::Any => None,
        }
    }

    fn value(&self) -> Expr {
        match self {
            Principal::CanonicalUser(e) | Principal::Aws(e) => e.clone(),
            Principal::Service(s) => Expr::str(s.as_str()),
            Principal::Any => Expr::str("*"),
        }
    }
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub sid: Option<String>,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub principals: Vec<Principal>,
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    /// An empty `Allow` statement.
    pub fn allow() -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            actions: Vec::new(),
            principals: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// An empty `Deny` statement.
    pub fn deny() -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow()
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn with_resources<I>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        self.resources.extend(resources);
        self
    }

    /// Render the statement. Single-element lists collapse to scalars, the
    /// way IAM itself echoes policies back.
    pub fn to_expr(&self) -> Expr {
        let mut entries: Vec<(&str, Expr)> = Vec::new();
        if let Some(sid) = &self.sid {
            entries.push(("Sid", Expr::str(sid.as_str())));
        }
        entries.push((
            "Action",
            collapse(self.actions.iter().map(|a| Expr::str(a.as_str())).collect()),
        ));
        entries.push(("Effect", Expr::str(self.effect.as_str())));
        if !self.principals.is_empty() {
            entries.push(("Principal", self.principal_expr()));
        }
        if !self.resources.is_empty() {
            entries.push(("Resource", collapse(self.resources.clone())));
        }
        Expr::object(entries)
    }

    fn principal_expr(&self) -> Expr {
        if self.principals.iter().any(|p| *p == Principal::Any) {
            return Expr::str("*");
        }
        let mut grouped: indexmap::IndexMap<&str, Vec<Expr>> = indexmap::IndexMap::new();
        for principal in &self.principals {
            if let Some(key) = principal.key() {
                grouped.entry(key).or_default().push(principal.value());
            }
        }
        Expr::object(grouped.into_iter().map(|(k, v)| (k, collapse(v))))
    }
}

fn collapse(mut items: Vec<Expr>) -> Expr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Expr::List(items)
    }
}

/// A policy document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_statement(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn to_expr(&self) -> Expr {
        Expr::object([
            (
                "Statement",
                Expr::List(self.statements.iter().map(PolicyStatement::to_expr).collect()),
            ),
            ("Version", Expr::str(POLICY_VERSION)),
        ])
    }
}

/// An IAM role (`AWS::IAM::Role`).
#[derive(Debug, Clone)]
pub struct Role {
    logical_id: String,
}

impl Role {
    /// Declare a role that `assumed_by` may assume, with the given managed
    /// policies attached.
    pub fn new(
        stack: &mut Stack,
        path: &ConstructPath,
        assumed_by: Principal,
        managed_policy_arns: Vec<Expr>,
    ) -> Result<Self> {
        let mut trust = PolicyDocument::new();
        trust.add_statement(
            PolicyStatement::allow()
                .with_actions(["sts:AssumeRole"])
                .with_principal(assumed_by),
        );

        let mut resource = Resource::new("AWS::IAM::Role")
            .with_property("AssumeRolePolicyDocument", trust.to_expr());
        if !managed_policy_arns.is_empty() {
            resource = resource.with_property("ManagedPolicyArns", Expr::List(managed_policy_arns));
        }

        let logical_id = stack.add_resource(path, resource)?;
        Ok(Self { logical_id })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }
}

/// ARN of an AWS managed policy, partition-aware.
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::sub(format!("arn:${{AWS::Partition}}:iam::aws:policy/{}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_user_statement() {
        let statement = PolicyStatement::allow()
            .with_actions(["s3:*"])
            .with_principal(Principal::CanonicalUser(Expr::get_att(
                "OAI1",
                "S3CanonicalUserId",
            )))
            .with_resources([
                Expr::get_att("Bucket1", "Arn"),
                Expr::join("", vec![Expr::get_att("Bucket1", "Arn"), Expr::str("/*")]),
            ]);

        assert_eq!(
            serde_json::to_value(statement.to_expr()).unwrap(),
            json!({
                "Action": "s3:*",
                "Effect": "Allow",
                "Principal": {"CanonicalUser": {"Fn::GetAtt": ["OAI1", "S3CanonicalUserId"]}},
                "Resource": [
                    {"Fn::GetAtt": ["Bucket1", "Arn"]},
                    {"Fn::Join": ["", [{"Fn::GetAtt": ["Bucket1", "Arn"]}, "/*"]]}
                ]
            })
        );
    }

    #[test]
    fn test_any_principal_wins() {
        let statement = PolicyStatement::deny()
            .with_actions(["s3:GetObject", "s3:PutObject"])
            .with_principal(Principal::Service("lambda.amazonaws.com".into()))
            .with_principal(Principal::Any);
        let value = serde_json::to_value(statement.to_expr()).unwrap();
        assert_eq!(value["Principal"], json!("*"));
        assert_eq!(value["Effect"], json!("Deny"));
        assert_eq!(value["Action"], json!(["s3:GetObject", "s3:PutObject"]));
    }

    #[test]
    fn test_document_version() {
        let mut doc = PolicyDocument::new();
        assert!(doc.is_empty());
        doc.add_statement(PolicyStatement::allow().with_actions(["sts:AssumeRole"]));
        let value = serde_json::to_value(doc.to_expr()).unwrap();
        assert_eq!(value["Version"], json!("2012-10-17"));
        assert_eq!(value["Statement"][0]["Action"], json!("sts:AssumeRole"));
    }

    #[test]
    fn test_managed_policy_arn() {
        assert_eq!(
            serde_json::to_value(managed_policy_arn("service-role/AWSLambdaBasicExecutionRole"))
                .unwrap(),
            json!({"Fn::Sub": "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"})
        );
    }
}
