// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identities and derived record addresses.
//!
//! An [`Authority`] is the compressed SEC1 encoding of a secp256k1 public
//! key. A [`RecordAddress`] is a pure function of `(authority, name)`: any
//! party can recompute it without a directory lookup, and the ledger keys
//! its record table by it.
//!
//! Addresses are searched like program-derived addresses: starting at proof
//! 255 and counting down, the first hash that is *not* the x-coordinate of a
//! curve point is taken, so no private key can ever sign for a record
//! address. The winning proof is stored in the record as `address_proof`.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::constants::{ADDRESS_DOMAIN_TAG, PROGRAM_ID, SEED_RECORD};

/// Length of a compressed secp256k1 public key.
pub const AUTHORITY_LEN: usize = 33;

/// Length of a derived record address.
pub const ADDRESS_LEN: usize = 32;

/// Error parsing a hex-encoded identity or address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("not a valid secp256k1 public key")]
    InvalidPoint,
}

/// Fixed-size byte newtype rendered as lowercase hex everywhere it leaves
/// the process (logs, JSON, URLs).
macro_rules! hex_newtype {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseKeyError> {
                let array: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| ParseKeyError::InvalidLength {
                            expected: $len,
                            actual: bytes.len(),
                        })?;
                Ok(Self(array))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(Authority, AUTHORITY_LEN);
hex_newtype!(RecordAddress, ADDRESS_LEN);

impl Authority {
    /// Identity of the holder of `key`.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut bytes = [0u8; AUTHORITY_LEN];
        bytes.copy_from_slice(point.as_bytes());
        Self(bytes)
    }

    /// Decode the public key behind this identity.
    pub fn verifying_key(&self) -> Result<VerifyingKey, ParseKeyError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| ParseKeyError::InvalidPoint)
    }
}

impl FromStr for Authority {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseKeyError::InvalidHex(e.to_string()))?;
        let authority = Self::from_slice(&bytes)?;
        authority.verifying_key()?;
        Ok(authority)
    }
}

impl FromStr for RecordAddress {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseKeyError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// Hash the seeds for one candidate proof.
fn candidate(authority: &Authority, name: &str, proof: u8) -> [u8; ADDRESS_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(SEED_RECORD);
    hasher.update(authority.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update([proof]);
    hasher.update(PROGRAM_ID);
    hasher.update(ADDRESS_DOMAIN_TAG);
    hasher.finalize().into()
}

/// Whether `bytes` is the x-coordinate of some secp256k1 point.
fn is_on_curve(bytes: &[u8; ADDRESS_LEN]) -> bool {
    let mut sec1 = [0u8; AUTHORITY_LEN];
    sec1[0] = 0x02;
    sec1[1..].copy_from_slice(bytes);
    k256::PublicKey::from_sec1_bytes(&sec1).is_ok()
}

/// Recompute the address of a record whose proof is already known.
///
/// Returns `None` when the seeds with this proof land on the curve, i.e.
/// the proof was not produced by [`find_record_address`].
pub fn create_record_address(authority: &Authority, name: &str, proof: u8) -> Option<RecordAddress> {
    let bytes = candidate(authority, name, proof);
    if is_on_curve(&bytes) {
        None
    } else {
        Some(RecordAddress(bytes))
    }
}

/// Derive the canonical address and proof of the record `(authority, name)`.
///
/// `None` only if all 256 candidates land on the curve.
pub fn find_record_address(authority: &Authority, name: &str) -> Option<(RecordAddress, u8)> {
    (0..=u8::MAX)
        .rev()
        .find_map(|proof| create_record_address(authority, name, proof).map(|addr| (addr, proof)))
}
