//! In-memory content store for development and tests.
//!
//! Identifiers are CIDv1-shaped (`bafkrei` + base32 SHA-256 of the bytes), so
//! identical content always maps to the same identifier.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::domain::{ComplaintRecord, ContentId, Hash256};

use super::{ContentStore, FetchError, UploadError};

const RAW_SHA256_CID_PREFIX: &str = "bafkrei";
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

#[derive(Default)]
struct FailurePlan {
    /// Evidence uploads that fail, keyed by file name
    by_name: HashMap<String, UploadError>,
    /// Next JSON document upload fails
    json: Option<UploadError>,
}

/// In-memory content store
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<ContentId, Bytes>>,
    failures: RwLock<FailurePlan>,
    gateway_url: String,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            failures: RwLock::new(FailurePlan::default()),
            gateway_url: "https://ipfs.io".to_string(),
        }
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Make every upload of a file called `name` fail with `error`.
    pub async fn fail_uploads_named(&self, name: impl Into<String>, error: UploadError) {
        self.failures.write().await.by_name.insert(name.into(), error);
    }

    /// Make the next JSON document upload fail with `error`.
    pub async fn fail_next_json_upload(&self, error: UploadError) {
        self.failures.write().await.json = Some(error);
    }

    /// Store raw bytes directly, bypassing the upload path.
    pub async fn insert_raw(&self, data: impl Into<Bytes>) -> ContentId {
        let data = data.into();
        let id = content_id_for(&data);
        self.objects.write().await.insert(id.clone(), data);
        id
    }

    /// Drop stored content so later fetches miss.
    pub async fn remove(&self, id: &ContentId) -> bool {
        self.objects.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &ContentId) -> bool {
        self.objects.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Content-derived identifier for `data`.
///
/// `bafkrei` followed by base32 of the bare SHA-256 digest. This is shaped
/// like a CIDv1 and passes validation, but it is not the real CIDv1 encoding
/// (which base32-encodes the `0x01 0x55 0x12 0x20` header together with the
/// digest), so it never matches the id a gateway would assign to the same
/// bytes.
pub fn content_id_for(data: &[u8]) -> ContentId {
    let digest: Hash256 = Sha256::digest(data).into();
    let encoded = format!("{}{}", RAW_SHA256_CID_PREFIX, base32_lower(&digest));
    ContentId::from_digest_encoding(encoded)
}

/// RFC 4648 base32, lowercase, unpadded
fn base32_lower(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put_blob(
        &self,
        name: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<ContentId, UploadError> {
        if let Some(error) = self.failures.read().await.by_name.get(name) {
            return Err(error.clone());
        }
        Ok(self.insert_raw(data).await)
    }

    async fn put_json(&self, record: &ComplaintRecord) -> Result<ContentId, UploadError> {
        if let Some(error) = self.failures.write().await.json.take() {
            return Err(error);
        }
        let body = record
            .to_json_bytes()
            .map_err(|e| UploadError::InvalidRequest(e.to_string()))?;
        Ok(self.insert_raw(body).await)
    }

    async fn get(&self, id: &ContentId) -> Result<Bytes, FetchError> {
        self.objects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(FetchError::NotFound)
    }

    fn gateway_url(&self, id: &ContentId) -> String {
        format!("{}/ipfs/{}", self.gateway_url.trim_end_matches('/'), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ids_differ_from_gateway_cids() {
        // CIDv1 raw/sha2-256 of the empty block as assigned by IPFS
        const EMPTY_RAW_CID: &str = "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku";

        let local = content_id_for(b"");
        assert!(local.as_str().starts_with("bafkrei"));
        assert_ne!(local.as_str(), EMPTY_RAW_CID);
    }

    #[test]
    fn test_base32_known_vectors() {
        // RFC 4648 test vectors, lowercased and unpadded
        assert_eq!(base32_lower(b""), "");
        assert_eq!(base32_lower(b"f"), "my");
        assert_eq!(base32_lower(b"fo"), "mzxq");
        assert_eq!(base32_lower(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_content_ids_are_deterministic() {
        let a = content_id_for(b"evidence");
        let b = content_id_for(b"evidence");
        let c = content_id_for(b"other evidence");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.version(), 1);
        assert_eq!(a.as_str().len(), 59);
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let store = InMemoryContentStore::new();
        let id = store
            .put_blob("a.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();

        let first = store.get(&id).await.unwrap();
        let second = store.get(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(&first[..], b"hello");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryContentStore::new();
        store
            .fail_uploads_named("bad.jpg", UploadError::Network("connection reset".into()))
            .await;

        let err = store
            .put_blob("bad.jpg", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Network(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_removed_content_is_not_found() {
        let store = InMemoryContentStore::new();
        let id = store.insert_raw(&b"gone soon"[..]).await;
        assert!(store.remove(&id).await);
        assert_eq!(store.get(&id).await.unwrap_err(), FetchError::NotFound);
    }
}
