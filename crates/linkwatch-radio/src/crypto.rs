//! AES-128-GCM sealing for encrypted links.
//!
//! Sealed body layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! The envelope header is authenticated as associated data, so a frame
//! cannot be replayed under a different source or destination.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Key, Nonce,
};
use linkwatch_core::LinkKey;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

pub const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,

    /// Wrong key, tampered body, or tampered header.
    #[error("authentication failed")]
    DecryptionFailed,

    #[error("sealed body too short")]
    CiphertextTooShort,
}

fn cipher(key: &LinkKey) -> Aes128Gcm {
    Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key.as_bytes()))
}

/// Encrypts `frame` under `key` with a random nonce.
pub fn seal(key: &LinkKey, aad: &[u8], frame: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher(key)
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload { msg: frame, aad },
        )
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a body produced by [`seal`].
pub fn open(key: &LinkKey, aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

    cipher(key)
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}
