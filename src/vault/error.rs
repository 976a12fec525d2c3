// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors of the upload and retrieval protocols.

use crate::chunker::ChunkError;
use crate::client::ClientError;
use crate::crypto::CryptoError;
use crate::program::{ErrorClass, RecordAddress};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Chunking(#[from] ChunkError),

    #[error("no record address can be derived for name {0:?}")]
    NoAddress(String),

    #[error("record {0} not found")]
    RecordNotFound(RecordAddress),

    #[error("record {0} is not sealed")]
    NotSealed(RecordAddress),

    #[error("incomplete reconstruction: found {found} fragments, expected {expected}")]
    IncompleteReconstruction { found: usize, expected: u32 },

    #[error("cannot resume upload: {0}")]
    ResumeMismatch(String),
}

impl VaultError {
    /// Place in the ledger error taxonomy. Transport and signer failures
    /// have none.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            VaultError::Client(ClientError::Rejected(e)) => Some(e.class()),
            VaultError::Client(_) => None,
            VaultError::Crypto(CryptoError::Authentication | CryptoError::Truncated) => {
                Some(ErrorClass::Integrity)
            }
            VaultError::Crypto(_) => None,
            VaultError::Chunking(_) | VaultError::NoAddress(_) => Some(ErrorClass::Validation),
            VaultError::RecordNotFound(_)
            | VaultError::NotSealed(_)
            | VaultError::ResumeMismatch(_) => Some(ErrorClass::State),
            VaultError::IncompleteReconstruction { .. } => Some(ErrorClass::Integrity),
        }
    }
}
