// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed operations and the transaction metadata the ledger returns.

use std::fmt;

use k256::ecdsa::{signature::Verifier, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::address::{Authority, RecordAddress};
use super::error::ProgramError;

/// One of the three record transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    Create {
        name: String,
        total_chunks: u32,
        content_type: String,
    },
    AppendFragment {
        index: u32,
        #[serde(with = "crate::program::encoding")]
        data: Vec<u8>,
    },
    Seal,
}

impl Instruction {
    /// Name written to the transaction log.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Create { .. } => "Create",
            Instruction::AppendFragment { .. } => "AppendFragment",
            Instruction::Seal => "Seal",
        }
    }
}

/// Unsigned operation body.
///
/// The signature covers the canonical JSON encoding of this struct, so the
/// field order here is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub signer: Authority,
    pub record: RecordAddress,
    /// Distinguishes otherwise identical operations
    pub nonce: String,
    pub instruction: Instruction,
}

impl Operation {
    pub fn new(signer: Authority, record: RecordAddress, instruction: Instruction) -> Self {
        Self {
            signer,
            record,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            instruction,
        }
    }

    /// Bytes covered by the signer's signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// An operation plus the signer's ECDSA signature over
/// [`Operation::signing_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignedOperation {
    #[schema(value_type = Object)]
    pub operation: Operation,
    /// Base64 of the 64-byte compact signature
    #[serde(with = "crate::program::encoding")]
    #[schema(value_type = String)]
    pub signature: Vec<u8>,
}

impl SignedOperation {
    /// Check that the declared signer produced the signature.
    pub fn verify(&self) -> Result<(), ProgramError> {
        let key = self
            .operation
            .signer
            .verifying_key()
            .map_err(|_| ProgramError::InvalidSignature)?;
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| ProgramError::InvalidSignature)?;
        let bytes = self
            .operation
            .signing_bytes()
            .map_err(|_| ProgramError::InvalidSignature)?;
        key.verify(&bytes, &signature)
            .map_err(|_| ProgramError::InvalidSignature)
    }

    /// Transaction id: SHA-256 over the signed body and the signature.
    pub fn op_id(&self) -> Result<OpId, serde_json::Error> {
        let mut hasher = Sha256::new();
        hasher.update(self.operation.signing_bytes()?);
        hasher.update(&self.signature);
        Ok(OpId(hex::encode(hasher.finalize())))
    }
}

/// Identifier of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of an address's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionSummary {
    /// Transaction id
    #[schema(value_type = String)]
    pub op_id: OpId,
    /// Position in the global commit order
    pub slot: u64,
    /// Executed instruction name
    pub instruction: String,
    /// Unix seconds at commit
    pub committed_at: i64,
}

/// Result of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    #[schema(value_type = String)]
    pub op_id: OpId,
    pub slot: u64,
}
