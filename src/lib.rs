//! # frontend-infra - CloudFormation stacks for a static website
//!
//! frontend-infra declares the infrastructure behind a static frontend: an
//! S3 bucket configured for website hosting and a CloudFront distribution in
//! front of it. The declarations are typed Rust values; synthesis turns them
//! into CloudFormation templates plus a manifest, ready for any deployment
//! tool that understands a cloud assembly.
//!
//! Nothing here talks to AWS. Provisioning, ordering at apply time and
//! failure handling are left to CloudFormation.
//!
//! ## Core Concepts
//!
//! - **App**: context values plus a set of stacks synthesized together
//! - **Stacks**: independently deployable sets of resources
//! - **Constructs**: resources identified by a path inside their stack, from
//!   which a stable logical id is derived
//! - **Cross-stack references**: values one stack reads from another, turned
//!   into exports and imports during synthesis
//! - **Cloud assembly**: the templates and manifest written by `synth`
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CLI Interface                         │
//! │               (synth, list, diff via clap)                   │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Composition (app)                        │
//! │         env context -> prefix -> storage, delivery           │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!          ┌────────────────────┴────────────────────┐
//!          ▼                                         ▼
//! ┌─────────────────────┐                 ┌─────────────────────┐
//! │   Storage stack     │  BucketRef ───▶ │   Delivery stack    │
//! │ bucket, OAI, policy │                 │    distribution     │
//! └─────────────────────┘                 └─────────────────────┘
//!          │                                         │
//!          └────────────────────┬────────────────────┘
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Synthesis                             │
//! │   imports/exports, reference checks, ordering, templates     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use frontend_infra::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut app = App::new();
//!     app.set_context("env", "prod");
//!
//!     compose(&mut app, &Config::default())?;
//!
//!     let assembly = app.synth()?;
//!     assembly.write_to(std::path::Path::new("cdk.out"))?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::app::{compose, App, Deployment};
    pub use crate::assembly::{CloudAssembly, StackArtifact};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::stack::{Environment, Stack};
    pub use crate::stacks::{DeliveryStack, DeliveryStackProps, StorageStack, StorageStackProps};
    pub use crate::template::{Expr, Output, RemovalPolicy, Resource, Template};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for frontend-infra operations.
pub mod error;

/// CloudFormation template model and intrinsic functions.
pub mod template;

/// Construct paths and the logical ids derived from them.
pub mod construct;

/// Stacks: named sets of resources with a target environment.
pub mod stack;

// ============================================================================
// Resources
// ============================================================================

/// Typed resource declarations.
///
/// - [`s3`](resources::s3): buckets, CORS, public access blocks, policies
/// - [`cloudfront`](resources::cloudfront): distributions and origin access
///   identities
/// - [`iam`](resources::iam): policy statements and roles
/// - [`auto_delete`](resources::auto_delete): emptying buckets on teardown
pub mod resources;

/// The storage and delivery stacks.
pub mod stacks;

// ============================================================================
// Synthesis
// ============================================================================

/// The app, cross-stack reference resolution and composition.
pub mod app;

/// Stack dependency graph.
pub mod graph;

/// Cloud assembly output: templates and manifest.
pub mod assembly;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration management.
///
/// Handles loading and merging configuration from multiple sources:
/// config files, environment variables and command-line arguments.
pub mod config;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of frontend-infra.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
