//! S3-compatible object storage client for published renders, thumbnails,
//! and clip renditions.

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ObjectStore, ObjectStoreConfig};
pub use error::{StorageError, StorageResult};
