//! FIR Vault Library
//!
//! Confidential complaint records on content-addressed storage. A complaint
//! and its evidence are pinned to a content store; the root document's
//! identifier is sealed into an opaque pointer that only the holder of a
//! per-complaint secret can open.
//!
//! ## Modules
//!
//! - [`domain`] - Records, content identifiers, pointers and secrets
//! - [`crypto`] - Pointer encryption (AES-256-GCM, HKDF-SHA256)
//! - [`infra`] - Content store trait, pinning client, in-memory store, retry
//! - [`assembler`] - Builds and pins records, issues pointer + secret
//! - [`resolver`] - Opens pointers and fetches records
//! - [`anchor`] - Optional on-chain pointer registry
//! - [`metrics`] - Counters and latency histograms
//! - [`telemetry`] - Log subscriber setup

use std::sync::Arc;

pub mod anchor;
pub mod assembler;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod resolver;
pub mod telemetry;

// Re-export commonly used types
pub use assembler::{
    AssemblerConfig, EvidenceFailure, RecordAssembler, SubmissionFailed, SubmissionReceipt,
    SubmissionStep,
};
pub use crypto::{decrypt, encrypt, DecryptError, EncryptionError};
pub use domain::{
    is_valid_content_id, ComplaintForm, ComplaintRecord, ComplaintType, ContentId,
    EncryptedPointer, EvidenceBlob, EvidenceFile, Priority, Secret, Witness,
};
pub use infra::{
    ContentStore, FetchError, InMemoryContentStore, PinningClient, PinningConfig, Result,
    UploadError, VaultError,
};
pub use resolver::{RecordResolver, ResolveError};

/// Submit a complaint with default assembler settings.
pub async fn assemble(
    store: Arc<dyn ContentStore>,
    form: ComplaintForm,
    evidence: Vec<EvidenceBlob>,
) -> std::result::Result<SubmissionReceipt, SubmissionFailed> {
    RecordAssembler::new(store).assemble(form, evidence).await
}

/// Open a pointer with its secret and fetch the record.
pub async fn resolve(
    store: Arc<dyn ContentStore>,
    pointer: &EncryptedPointer,
    secret: &Secret,
) -> std::result::Result<ComplaintRecord, ResolveError> {
    RecordResolver::new(store).resolve(pointer, secret).await
}
