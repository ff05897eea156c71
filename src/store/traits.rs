//! Storage seams the pipeline depends on.

use async_trait::async_trait;

use crate::error::{ObjectStoreError, StoreError};
use crate::pipeline::types::PolicyRecord;

/// Recipient policy lookup.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Exact-key read. `Ok(None)` means no such recipient.
    async fn get(&self, recipient: &str) -> Result<Option<PolicyRecord>, StoreError>;
}

/// Blob storage holding raw inbound emails.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the whole object into memory.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}
