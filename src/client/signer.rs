// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory secp256k1 signer.
//!
//! Signatures are ECDSA over SHA-256 with RFC 6979 nonces, so signing the
//! same message twice yields the same bytes. Key derivation depends on
//! that: the upload key is re-derived at retrieval time by signing the
//! same message again.

use async_trait::async_trait;
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use k256::elliptic_curve::rand_core::OsRng;
use k256::SecretKey;

use super::{ClientError, MessageSigner};
use crate::program::Authority;

/// Signer backed by a private key held in process memory.
pub struct LocalSigner {
    key: SigningKey,
    authority: Authority,
}

impl LocalSigner {
    pub fn new(key: SigningKey) -> Self {
        let authority = Authority::from_verifying_key(key.verifying_key());
        Self { key, authority }
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self::new(SigningKey::random(&mut OsRng))
    }

    /// Key from raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        SigningKey::from_slice(bytes)
            .map(Self::new)
            .map_err(|e| ClientError::Signer(format!("Invalid private key: {e}")))
    }

    /// Key from a SEC1 or PKCS#8 PEM document.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, ClientError> {
        let pem_str = std::str::from_utf8(pem_bytes)
            .map_err(|e| ClientError::Signer(format!("Invalid UTF-8: {e}")))?;

        let pem = pem::parse(pem_str)
            .map_err(|e| ClientError::Signer(format!("Invalid PEM: {e}")))?;

        let secret_key = SecretKey::from_sec1_der(pem.contents())
            .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
            .map_err(|e| ClientError::Signer(format!("Invalid key format: {e}")))?;

        Ok(Self::new(SigningKey::from(secret_key)))
    }
}

/// Parse PKCS#8 DER to extract the secret key.
fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageSigner for LocalSigner {
    fn authority(&self) -> Authority {
        self.authority
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        let signature: Signature = self.key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::pkcs8::{EncodePrivateKey, LineEnding};

    #[tokio::test]
    async fn signatures_are_deterministic() {
        let signer = LocalSigner::from_bytes(&[11; 32]).unwrap();
        let a = signer.sign_message(b"encrypt:photo").await.unwrap();
        let b = signer.sign_message(b"encrypt:photo").await.unwrap();
        let c = signer.sign_message(b"encrypt:other").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn pem_round_trip_keeps_identity() {
        let key = SigningKey::random(&mut OsRng);
        let pem = SecretKey::from(&key)
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap();

        let signer = LocalSigner::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(
            signer.authority(),
            Authority::from_verifying_key(key.verifying_key())
        );
    }

    #[test]
    fn invalid_key_material_is_rejected() {
        assert!(matches!(
            LocalSigner::from_bytes(&[0; 32]),
            Err(ClientError::Signer(_))
        ));
        assert!(matches!(
            LocalSigner::from_pem(b"not a pem"),
            Err(ClientError::Signer(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let signer = LocalSigner::generate();
        let rendered = format!("{signer:?}");
        assert!(rendered.contains("authority"));
        assert!(!rendered.contains("key:"));
    }
}
