//! Encrypted content pointers
//!
//! A pointer is the root content identifier of a complaint, sealed under the
//! complaint's [`Secret`]:
//!
//! ```text
//! key     = HKDF-SHA256(ikm = secret, salt = salt(16), info = b"FIR_POINTER_KEY_V1")
//! aad     = b"FIR_POINTER_AAD_V1" || version(1)
//! pointer = base64url(version(1) || salt(16) || nonce(12) || AES-256-GCM(key, nonce, aad, id))
//! ```
//!
//! Salt and nonce are fresh per call, so sealing the same identifier twice
//! gives two different pointers.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::domain::{EncryptedPointer, Secret};

/// Current pointer format version
pub const POINTER_VERSION_V1: u8 = 1;

/// HKDF salt size (16 bytes)
pub const SALT_SIZE: usize = 16;

/// Nonce size for AES-GCM (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// AES-256 key size
pub const KEY_SIZE: usize = 32;

/// Header length: version || salt || nonce
pub const POINTER_HEADER_SIZE: usize = 1 + SALT_SIZE + NONCE_SIZE;

/// HKDF info string for pointer keys.
pub const DOMAIN_POINTER_KEY_V1: &[u8] = b"FIR_POINTER_KEY_V1";

/// AAD prefix binding ciphertexts to the pointer format.
pub const DOMAIN_POINTER_AAD_V1: &[u8] = b"FIR_POINTER_AAD_V1";

/// Error type for sealing a pointer
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("secret must not be empty")]
    EmptySecret,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Opening a pointer failed.
///
/// Wrong secret, truncated input, unknown version and tampered ciphertext all
/// produce this same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pointer could not be decrypted")]
pub struct DecryptError;

/// Symmetric cipher used to seal and open content pointers.
pub trait PointerCipher: Send + Sync {
    /// Encrypt `plaintext` under `secret`.
    fn seal(&self, plaintext: &str, secret: &Secret) -> Result<EncryptedPointer, EncryptionError>;

    /// Decrypt `pointer` with `secret`. Never panics on bad input.
    fn open(&self, pointer: &EncryptedPointer, secret: &Secret) -> Result<String, DecryptError>;
}

/// Default pointer cipher: HKDF-SHA256 + AES-256-GCM
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmPointerCipher;

impl AesGcmPointerCipher {
    pub fn new() -> Self {
        Self
    }
}

impl PointerCipher for AesGcmPointerCipher {
    fn seal(&self, plaintext: &str, secret: &Secret) -> Result<EncryptedPointer, EncryptionError> {
        if secret.is_empty() {
            return Err(EncryptionError::EmptySecret);
        }

        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let mut key = derive_pointer_key(secret, &salt).ok_or(EncryptionError::KeyDerivationFailed)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()));
        key.zeroize();
        let cipher = cipher?;

        let aad = pointer_aad(POINTER_VERSION_V1);
        let ciphertext_with_tag = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut raw = Vec::with_capacity(POINTER_HEADER_SIZE + ciphertext_with_tag.len());
        raw.push(POINTER_VERSION_V1);
        raw.extend_from_slice(&salt);
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext_with_tag);

        Ok(EncryptedPointer::new(base64_url_encode(&raw)))
    }

    fn open(&self, pointer: &EncryptedPointer, secret: &Secret) -> Result<String, DecryptError> {
        let raw = base64_url_decode(pointer.as_str()).ok_or(DecryptError)?;
        if raw.len() < POINTER_HEADER_SIZE + TAG_SIZE {
            return Err(DecryptError);
        }

        let version = raw[0];
        if version != POINTER_VERSION_V1 {
            return Err(DecryptError);
        }

        let salt = &raw[1..1 + SALT_SIZE];
        let nonce = Nonce::from_slice(&raw[1 + SALT_SIZE..POINTER_HEADER_SIZE]);
        let ciphertext = &raw[POINTER_HEADER_SIZE..];

        let mut key = derive_pointer_key(secret, salt).ok_or(DecryptError)?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| DecryptError);
        key.zeroize();

        let aad = pointer_aad(version);
        let plaintext = cipher?
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| DecryptError)?;

        String::from_utf8(plaintext).map_err(|_| DecryptError)
    }
}

/// Encrypt a content identifier (or any short string) under `secret`.
pub fn encrypt(plaintext: &str, secret: &Secret) -> Result<EncryptedPointer, EncryptionError> {
    AesGcmPointerCipher.seal(plaintext, secret)
}

/// Decrypt a pointer produced by [`encrypt`].
///
/// The caller must still validate the result as a content identifier.
pub fn decrypt(pointer: &EncryptedPointer, secret: &Secret) -> Result<String, DecryptError> {
    AesGcmPointerCipher.open(pointer, secret)
}

/// Derive the AES-256 key for one pointer.
fn derive_pointer_key(secret: &Secret, salt: &[u8]) -> Option<[u8; KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(Some(salt), secret.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(DOMAIN_POINTER_KEY_V1, &mut okm).ok()?;
    Some(okm)
}

fn pointer_aad(version: u8) -> Vec<u8> {
    let mut aad = Vec::with_capacity(DOMAIN_POINTER_AAD_V1.len() + 1);
    aad.extend_from_slice(DOMAIN_POINTER_AAD_V1);
    aad.push(version);
    aad
}

/// Encode bytes as base64url (no padding)
pub fn base64_url_encode(data: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, data)
}

/// Decode base64url (with or without padding)
pub fn base64_url_decode(s: &str) -> Option<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, s.trim())
        .or_else(|_| base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE, s.trim()))
        .ok()
}
