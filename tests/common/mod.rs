//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use fir_vault::{
    ComplaintForm, ComplaintType, ContentStore, EvidenceBlob, InMemoryContentStore, Witness,
};

/// A well-formed CIDv0 as returned by Pinata
pub const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

/// A well-formed CIDv1 (base32)
pub const CID_V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

pub fn memory_store() -> Arc<InMemoryContentStore> {
    Arc::new(InMemoryContentStore::new())
}

/// Upcast for APIs that take a trait object
pub fn as_store(store: &Arc<InMemoryContentStore>) -> Arc<dyn ContentStore> {
    store.clone()
}

pub fn theft_form() -> ComplaintForm {
    ComplaintForm::new(
        ComplaintType::Theft,
        "Phone theft near the bus stand around 9pm",
        "Gandhipuram bus stand",
    )
    .with_email("victim@example.com")
    .with_evidence_description("CCTV still and a photo of the receipt")
}

pub fn witness(name: &str) -> Witness {
    Witness {
        name: name.to_string(),
        contact: "+91 98765 43210".to_string(),
        statement: "Saw a man run towards the market".to_string(),
    }
}

pub fn photo(name: &str) -> EvidenceBlob {
    EvidenceBlob::new(name, "image/jpeg", format!("jpeg bytes of {name}").into_bytes())
}
