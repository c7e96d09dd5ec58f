//! Pointer resolution: decrypt, validate, fetch, parse.
//!
//! A wrong secret and a ciphertext that decrypts to something that is not a
//! content identifier are reported identically, so callers cannot tell which
//! one happened.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crypto::{AesGcmPointerCipher, PointerCipher};
use crate::domain::{ComplaintRecord, ContentId, EncryptedPointer, Secret};
use crate::infra::{ContentStore, FetchError};
use crate::metrics::{metric_names, timed, MetricsRegistry};

const GENERIC_FAILURE: &str = "Unable to decrypt or retrieve this complaint. Check the pointer and secret.";
const UNAVAILABLE: &str = "The complaint store is temporarily unavailable. Please retry later.";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("secret does not open this pointer")]
    InvalidSecret,

    #[error("complaint record unavailable: {0}")]
    Unavailable(#[source] FetchError),

    #[error("complaint record is corrupt: {reason}")]
    Corrupt { reason: String },
}

impl ResolveError {
    /// Message safe to show an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolveError::InvalidSecret | ResolveError::Corrupt { .. } => GENERIC_FAILURE,
            ResolveError::Unavailable(_) => UNAVAILABLE,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Unavailable(e) if e.is_transient())
    }

    fn metric_name(&self) -> &'static str {
        match self {
            ResolveError::InvalidSecret => metric_names::RESOLVE_INVALID_SECRET,
            ResolveError::Unavailable(_) => metric_names::RESOLVE_UNAVAILABLE,
            ResolveError::Corrupt { .. } => metric_names::RESOLVE_CORRUPT,
        }
    }
}

/// Turns (pointer, secret) pairs back into complaint records.
pub struct RecordResolver {
    store: Arc<dyn ContentStore>,
    cipher: Arc<dyn PointerCipher>,
    timeout: Option<Duration>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            cipher: Arc::new(AesGcmPointerCipher::new()),
            timeout: None,
            metrics: None,
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn PointerCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Caller-side limit on the fetch, reported as `FetchError::Timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn resolve(
        &self,
        pointer: &EncryptedPointer,
        secret: &Secret,
    ) -> Result<ComplaintRecord, ResolveError> {
        let outcome = match &self.metrics {
            Some(metrics) => {
                timed(metrics, metric_names::RESOLVE_LATENCY, self.run(pointer, secret)).await
            }
            None => self.run(pointer, secret).await,
        };

        if let Some(metrics) = &self.metrics {
            let name = match &outcome {
                Ok(_) => metric_names::RESOLVE_OK,
                Err(e) => e.metric_name(),
            };
            metrics.inc_counter(name).await;
        }

        outcome
    }

    async fn run(
        &self,
        pointer: &EncryptedPointer,
        secret: &Secret,
    ) -> Result<ComplaintRecord, ResolveError> {
        let candidate = self.cipher.open(pointer, secret).map_err(|_| {
            debug!("Pointer did not open with the supplied secret");
            ResolveError::InvalidSecret
        })?;

        let content_id = ContentId::parse(&candidate).map_err(|_| {
            debug!("Pointer opened to a non-identifier");
            ResolveError::InvalidSecret
        })?;

        let fetch = self.store.get(&content_id);
        let bytes = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .unwrap_or(Err(FetchError::Timeout)),
            None => fetch.await,
        }
        .map_err(|e| {
            warn!(error = %e, "Complaint record fetch failed");
            ResolveError::Unavailable(e)
        })?;

        let record: ComplaintRecord = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, bytes = bytes.len(), "Complaint record failed to parse");
            ResolveError::Corrupt {
                reason: e.to_string(),
            }
        })?;

        info!(
            complaint_type = %record.complaint_type,
            evidence = record.evidence.files.len(),
            "Complaint resolved"
        );

        Ok(record)
    }
}
