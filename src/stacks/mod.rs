//! The two stacks of a frontend deployment.
//!
//! [`storage::StorageStack`] owns the website bucket; [`delivery::DeliveryStack`]
//! puts a CloudFront distribution in front of it and can only be built from
//! the bucket handle the storage stack hands out.

pub mod delivery;
pub mod storage;

pub use delivery::{DeliveryStack, DeliveryStackProps};
pub use storage::{StorageStack, StorageStackProps};
