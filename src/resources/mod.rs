//! Typed declarations of the AWS resources the stacks use.

pub mod auto_delete;
pub mod cloudfront;
pub mod iam;
pub mod s3;
