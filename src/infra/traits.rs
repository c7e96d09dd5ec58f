//! Trait definitions for the content-addressed store

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::domain::{ComplaintRecord, ContentId};

use super::{FetchError, UploadError};

/// Content-addressed store holding evidence blobs and complaint documents.
///
/// Identifiers returned by `put_*` are validated [`ContentId`]s; `get` never
/// touches the network for an identifier that failed validation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload an arbitrary blob
    async fn put_blob(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<ContentId, UploadError>;

    /// Upload the canonical complaint JSON document
    async fn put_json(&self, record: &ComplaintRecord) -> Result<ContentId, UploadError>;

    /// Fetch raw bytes by identifier
    async fn get(&self, id: &ContentId) -> Result<Bytes, FetchError>;

    /// Convenience link for an identifier (not authoritative)
    fn gateway_url(&self, id: &ContentId) -> String;
}
