// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-upload authenticated encryption.
//!
//! The key is never stored. It is derived on demand as `SHA-256(signature)`
//! where the signature covers [`key_message`], a fixed message bound to the
//! upload name. Whoever can produce that signature can derive the key;
//! nobody else can.
//!
//! Ciphertext layout: `nonce (12) ‖ ciphertext ‖ tag (16)`, ChaCha20-Poly1305
//! with empty associated data.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the derived symmetric key.
pub const KEY_LEN: usize = 32;

/// Size of the Poly1305 tag.
pub const TAG_LEN: usize = 16;

/// Bytes added by [`encrypt`] on top of the plaintext.
pub const ENCRYPTION_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("authentication failed: wrong key, tampered or incomplete data")]
    Authentication,

    #[error("ciphertext shorter than nonce and tag")]
    Truncated,

    #[error("encryption failed")]
    Encryption,

    #[error("system randomness unavailable")]
    Randomness,
}

/// Symmetric key for one upload. Zeroed on drop, never cloned.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    fn aead(&self) -> Result<LessSafeKey, CryptoError> {
        let unbound =
            UnboundKey::new(&CHACHA20_POLY1305, &self.0).map_err(|_| CryptoError::Encryption)?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// The message whose signature yields the key for upload `name`.
pub fn key_message(name: &str) -> Vec<u8> {
    format!("encrypt:{name}").into_bytes()
}

/// Derive the upload key from a signature over [`key_message`].
pub fn derive_key(signature: &[u8]) -> EncryptionKey {
    EncryptionKey(Sha256::digest(signature).into())
}

/// Encrypt under a fresh random nonce.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::Randomness)?;

    let mut in_out = plaintext.to_vec();
    key.aead()?
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Encryption)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Decrypt `nonce ‖ ciphertext ‖ tag`. Fails closed: either the full
/// plaintext or an error, never partial output.
pub fn decrypt(key: &EncryptionKey, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < ENCRYPTION_OVERHEAD {
        return Err(CryptoError::Truncated);
    }
    let (nonce, sealed) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| CryptoError::Truncated)?;

    let mut in_out = sealed.to_vec();
    let plaintext = key
        .aead()?
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Authentication)?;
    Ok(plaintext.to_vec())
}
