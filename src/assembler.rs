//! Record assembly: evidence upload, document pinning and pointer sealing.
//!
//! ```text
//! evidence blobs ──put_blob (concurrent)──▶ EvidenceFile[] (+ per-file failures)
//!                                             │
//!                     ComplaintRecord ◀───────┘  timestamp stamped here
//!                           │
//!                      put_json ──▶ root ContentId
//!                           │
//!            Secret::generate ──▶ seal(root, secret) ──▶ EncryptedPointer
//! ```
//!
//! Evidence failures are reported per file and never abort the submission.
//! A failed root upload aborts it: no pointer or secret exists without a
//! committed root document.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::crypto::{AesGcmPointerCipher, EncryptionError, PointerCipher};
use crate::domain::{
    ComplaintForm, ComplaintRecord, ContentId, EncryptedPointer, EvidenceBlob, EvidenceFile,
    Secret,
};
use crate::infra::{ContentStore, Retry, RetryConfig, UploadError};
use crate::metrics::{metric_names, timed, MetricsRegistry};

/// Step at which a submission was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStep {
    Validation,
    RootDocument,
    Encryption,
}

impl fmt::Display for SubmissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStep::Validation => write!(f, "validation"),
            SubmissionStep::RootDocument => write!(f, "root document upload"),
            SubmissionStep::Encryption => write!(f, "pointer encryption"),
        }
    }
}

/// Fatal submission error. No pointer or secret was produced.
#[derive(Debug, Error)]
pub enum SubmissionFailed {
    #[error("complaint form is invalid: {0}")]
    Validation(String),

    #[error("complaint document upload failed: {0}")]
    RootDocument(#[source] UploadError),

    #[error("pointer encryption failed: {0}")]
    Encryption(#[source] EncryptionError),
}

impl SubmissionFailed {
    pub fn step(&self) -> SubmissionStep {
        match self {
            SubmissionFailed::Validation(_) => SubmissionStep::Validation,
            SubmissionFailed::RootDocument(_) => SubmissionStep::RootDocument,
            SubmissionFailed::Encryption(_) => SubmissionStep::Encryption,
        }
    }
}

/// Evidence file that could not be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceFailure {
    pub name: String,
    pub error: UploadError,
}

/// Result of a successful submission, shown once to the submitter.
#[derive(Debug)]
pub struct SubmissionReceipt {
    /// Correlation id for logs; not part of the record
    pub submission_id: Uuid,
    pub pointer: EncryptedPointer,
    pub secret: Secret,
    /// Evidence listed in the record, in submission order
    pub evidence: Vec<EvidenceFile>,
    pub evidence_failures: Vec<EvidenceFailure>,
}

/// Assembler tuning
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Caller-side limit per upload, reported as `UploadError::Timeout`
    pub upload_timeout: Option<Duration>,
    /// Retry policy for individual evidence uploads
    pub evidence_retry: RetryConfig,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            upload_timeout: None,
            evidence_retry: RetryConfig::none(),
        }
    }
}

/// Builds and pins complaint records, then seals their root identifier.
pub struct RecordAssembler {
    store: Arc<dyn ContentStore>,
    cipher: Arc<dyn PointerCipher>,
    config: AssemblerConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl RecordAssembler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            cipher: Arc::new(AesGcmPointerCipher::new()),
            config: AssemblerConfig::default(),
            metrics: None,
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn PointerCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Upload evidence, pin the record and seal a pointer to it.
    pub async fn assemble(
        &self,
        form: ComplaintForm,
        evidence: Vec<EvidenceBlob>,
    ) -> Result<SubmissionReceipt, SubmissionFailed> {
        let submission_id = Uuid::new_v4();

        let outcome = match &self.metrics {
            Some(metrics) => {
                let run = self.run(submission_id, form, evidence);
                timed(metrics, metric_names::ASSEMBLE_LATENCY, run).await
            }
            None => self.run(submission_id, form, evidence).await,
        };

        if let Some(metrics) = &self.metrics {
            match &outcome {
                Ok(receipt) => {
                    metrics.inc_counter(metric_names::SUBMISSIONS_COMPLETED).await;
                    metrics
                        .add_counter(metric_names::EVIDENCE_UPLOADED, receipt.evidence.len() as u64)
                        .await;
                    metrics
                        .add_counter(
                            metric_names::EVIDENCE_FAILED,
                            receipt.evidence_failures.len() as u64,
                        )
                        .await;
                }
                Err(_) => metrics.inc_counter(metric_names::SUBMISSIONS_FAILED).await,
            }
        }

        outcome
    }

    async fn run(
        &self,
        submission_id: Uuid,
        form: ComplaintForm,
        evidence: Vec<EvidenceBlob>,
    ) -> Result<SubmissionReceipt, SubmissionFailed> {
        form.validate().map_err(|reason| {
            warn!(%submission_id, reason = %reason, "Rejected complaint form");
            SubmissionFailed::Validation(reason)
        })?;

        let results = join_all(evidence.iter().map(|blob| self.upload_evidence(blob))).await;

        let mut files = Vec::with_capacity(evidence.len());
        let mut failures = Vec::new();
        for (blob, result) in evidence.iter().zip(results) {
            match result {
                Ok(content_id) => files.push(EvidenceFile {
                    name: blob.name.clone(),
                    url: self.store.gateway_url(&content_id),
                    content_id,
                }),
                Err(error) => {
                    warn!(%submission_id, file = %blob.name, error = %error, "Evidence upload failed");
                    failures.push(EvidenceFailure {
                        name: blob.name.clone(),
                        error,
                    });
                }
            }
        }

        let record = ComplaintRecord::from_form(form, files.clone(), Utc::now());

        let root_id: ContentId = self
            .with_timeout(self.store.put_json(&record))
            .await
            .map_err(|error| {
                warn!(%submission_id, error = %error, "Complaint document upload failed");
                SubmissionFailed::RootDocument(error)
            })?;

        let secret = Secret::generate();
        let pointer = self
            .cipher
            .seal(root_id.as_str(), &secret)
            .map_err(SubmissionFailed::Encryption)?;

        info!(
            %submission_id,
            complaint_type = %record.complaint_type,
            evidence_uploaded = files.len(),
            evidence_failed = failures.len(),
            "Complaint submitted"
        );

        Ok(SubmissionReceipt {
            submission_id,
            pointer,
            secret,
            evidence: files,
            evidence_failures: failures,
        })
    }

    async fn upload_evidence(&self, blob: &EvidenceBlob) -> Result<ContentId, UploadError> {
        Retry::new(self.config.evidence_retry.clone())
            .run_with_predicate(
                "evidence upload",
                || {
                    self.with_timeout(self.store.put_blob(
                        &blob.name,
                        blob.data.clone(),
                        &blob.content_type,
                    ))
                },
                UploadError::is_transient,
            )
            .await
            .into_result()
    }

    async fn with_timeout<T>(
        &self,
        upload: impl Future<Output = Result<T, UploadError>>,
    ) -> Result<T, UploadError> {
        match self.config.upload_timeout {
            Some(limit) => tokio::time::timeout(limit, upload)
                .await
                .unwrap_or(Err(UploadError::Timeout)),
            None => upload.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decrypt;
    use crate::domain::{ComplaintType, Witness};
    use crate::infra::{InMemoryContentStore, MockContentStore};
    use bytes::Bytes;

    fn form() -> ComplaintForm {
        ComplaintForm::new(
            ComplaintType::Harassment,
            "Repeated threatening calls",
            "No.36, south alley, coimbatore",
        )
        .with_email("citizen@example.com")
        .with_witness(Witness {
            name: "R. Kumar".to_string(),
            contact: "+91 90000 00000".to_string(),
            statement: "Heard the calls on speaker".to_string(),
        })
    }

    #[tokio::test]
    async fn test_assemble_without_evidence() {
        let store = Arc::new(InMemoryContentStore::new());
        let assembler = RecordAssembler::new(store.clone());

        let receipt = assembler.assemble(form(), Vec::new()).await.unwrap();

        assert!(receipt.evidence.is_empty());
        assert!(receipt.evidence_failures.is_empty());
        let root = decrypt(&receipt.pointer, &receipt.secret).unwrap();
        assert!(store.contains(&ContentId::parse(&root).unwrap()).await);
    }

    #[tokio::test]
    async fn test_invalid_form_uploads_nothing() {
        let store = Arc::new(InMemoryContentStore::new());
        let assembler = RecordAssembler::new(store.clone());
        let bad = ComplaintForm::new(ComplaintType::Other, "", "nowhere");

        let err = assembler
            .assemble(bad, vec![EvidenceBlob::new("a.txt", "text/plain", "a")])
            .await
            .unwrap_err();

        assert_eq!(err.step(), SubmissionStep::Validation);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_root_failure_is_fatal() {
        let mut store = MockContentStore::new();
        store
            .expect_put_json()
            .returning(|_| Err(UploadError::Auth { status: 401 }));

        let assembler = RecordAssembler::new(Arc::new(store));
        let err = assembler.assemble(form(), Vec::new()).await.unwrap_err();

        assert_eq!(err.step(), SubmissionStep::RootDocument);
        assert!(matches!(
            err,
            SubmissionFailed::RootDocument(UploadError::Auth { status: 401 })
        ));
    }

    #[tokio::test]
    async fn test_evidence_uses_store_gateway_links() {
        let store = Arc::new(InMemoryContentStore::new().with_gateway_url("https://gw.example"));
        let assembler = RecordAssembler::new(store);

        let receipt = assembler
            .assemble(
                form(),
                vec![EvidenceBlob::new("photo.jpg", "image/jpeg", Bytes::from_static(b"jpg"))],
            )
            .await
            .unwrap();

        let file = &receipt.evidence[0];
        assert_eq!(file.name, "photo.jpg");
        assert_eq!(file.url, format!("https://gw.example/ipfs/{}", file.content_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_evidence_failure_is_retried() {
        let mut store = MockContentStore::new();
        let mut calls = 0;
        store.expect_put_blob().returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(UploadError::Network("reset".into()))
            } else {
                Ok(crate::infra::content_id_for(b"retried"))
            }
        });
        store
            .expect_put_json()
            .returning(|_| Ok(crate::infra::content_id_for(b"root")));
        store
            .expect_gateway_url()
            .returning(|id| format!("https://ipfs.io/ipfs/{id}"));

        let config = AssemblerConfig {
            upload_timeout: None,
            evidence_retry: RetryConfig::uploads(),
        };
        let assembler = RecordAssembler::new(Arc::new(store)).with_config(config);

        let receipt = assembler
            .assemble(form(), vec![EvidenceBlob::new("a.bin", "", "data")])
            .await
            .unwrap();

        assert_eq!(receipt.evidence.len(), 1);
        assert!(receipt.evidence_failures.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let metrics = Arc::new(MetricsRegistry::new());
        let store = Arc::new(InMemoryContentStore::new());
        store
            .fail_uploads_named("broken.mp4", UploadError::SizeLimit { size: 1 << 30 })
            .await;
        let assembler = RecordAssembler::new(store).with_metrics(metrics.clone());

        assembler
            .assemble(
                form(),
                vec![
                    EvidenceBlob::new("ok.jpg", "image/jpeg", "ok"),
                    EvidenceBlob::new("broken.mp4", "video/mp4", "broken"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(metrics.get_counter(metric_names::SUBMISSIONS_COMPLETED).await, 1);
        assert_eq!(metrics.get_counter(metric_names::EVIDENCE_UPLOADED).await, 1);
        assert_eq!(metrics.get_counter(metric_names::EVIDENCE_FAILED).await, 1);
    }
}
