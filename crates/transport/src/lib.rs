//! sitesync-transport: remote object store boundary
//!
//! Defines the [`ObjectStore`] trait the sync executor drives, an S3
//! implementation, a local filesystem implementation for tests, and the
//! remote catalogue fetch/persist logic.

pub mod catalogue;
pub mod local;
pub mod s3;
pub mod sync;

pub use catalogue::{CatalogueStore, RemoteCatalogueSource};
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
pub use sync::{execute_changes, SyncOutcome};

use async_trait::async_trait;
use bytes::Bytes;

use sitesync_core::{RemoteAttributes, Result};

/// The four primitives sitesync needs from an object store.
///
/// Not-found is `Ok(None)` on `get`, never an error; transport and
/// credential failures always surface as errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes, or `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Create or replace an object with the given body and attributes.
    async fn put(&self, key: &str, body: Bytes, attributes: &RemoteAttributes) -> Result<()>;

    /// Rewrite an existing object's attributes in place, leaving its
    /// content untouched.
    async fn copy_with_attributes(&self, key: &str, attributes: &RemoteAttributes) -> Result<()>;

    /// Remove an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
