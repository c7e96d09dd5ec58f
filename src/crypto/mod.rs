//! Cryptographic utilities for complaint pointers
//!
//! Provides:
//! - Pointer encryption (HKDF-SHA256 key derivation + AES-256-GCM)
//! - The injectable [`PointerCipher`] seam with its default implementation

mod encrypt;

pub use encrypt::*;
