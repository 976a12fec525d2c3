// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Collaborators
//!
//! The upload and retrieval protocols consume exactly five capabilities:
//!
//! | Capability | Trait method |
//! |------------|--------------|
//! | submit a signed operation | [`LedgerClient::submit_signed_operation`] |
//! | fetch a record | [`LedgerClient::fetch_record`] |
//! | list an address's transactions | [`LedgerClient::fetch_transaction_history`] |
//! | fetch one transaction's logs | [`LedgerClient::fetch_transaction_logs`] |
//! | sign an arbitrary message | [`MessageSigner::sign_message`] |
//!
//! Implementations shipped here:
//!
//! - `local` - the in-process [`Ledger`](crate::ledger::Ledger)
//! - `http` - a remote ledger node over its JSON API
//! - `signer` - a secp256k1 key held in memory

pub mod http;
pub mod local;
pub mod log_cache;
pub mod signer;

use async_trait::async_trait;

use crate::program::{
    Authority, Instruction, OpId, Operation, ProgramError, Record, RecordAddress, SignedOperation,
    TransactionSummary,
};

pub use http::HttpLedgerClient;
pub use log_cache::LogCache;
pub use signer::LocalSigner;

/// Errors surfaced by ledger clients and signers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("ledger rejected operation: {0}")]
    Rejected(#[from] ProgramError),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Access to a ledger node.
///
/// `submit_signed_operation` must only return once the operation is
/// committed: callers rely on its effect being visible to the next call.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit_signed_operation(&self, operation: &SignedOperation)
        -> Result<OpId, ClientError>;

    async fn fetch_record(&self, address: &RecordAddress) -> Result<Option<Record>, ClientError>;

    /// Every transaction that touched `address`. Order is unspecified.
    async fn fetch_transaction_history(
        &self,
        address: &RecordAddress,
    ) -> Result<Vec<TransactionSummary>, ClientError>;

    /// Log lines of one transaction, `None` when unknown or no longer
    /// retained.
    async fn fetch_transaction_logs(&self, op_id: &OpId)
        -> Result<Option<Vec<String>>, ClientError>;
}

/// Opaque signing capability held by the caller.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// Identity whose signatures this signer produces.
    fn authority(&self) -> Authority;

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, ClientError>;
}

/// Build and sign an operation targeting `record`.
pub async fn sign_operation<S: MessageSigner + ?Sized>(
    signer: &S,
    record: RecordAddress,
    instruction: Instruction,
) -> Result<SignedOperation, ClientError> {
    let operation = Operation::new(signer.authority(), record, instruction);
    let bytes = operation
        .signing_bytes()
        .map_err(|e| ClientError::Signer(e.to_string()))?;
    let signature = signer.sign_message(&bytes).await?;
    Ok(SignedOperation {
        operation,
        signature,
    })
}
