// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! [`LedgerClient`] over an in-process [`Ledger`].

use std::sync::Arc;

use async_trait::async_trait;

use super::{ClientError, LedgerClient};
use crate::ledger::{Ledger, LedgerError, MAX_HISTORY_PAGE};
use crate::program::{OpId, Record, RecordAddress, SignedOperation, TransactionSummary};

impl From<LedgerError> for ClientError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Program(e) => ClientError::Rejected(e),
            other => ClientError::Ledger(other.to_string()),
        }
    }
}

#[async_trait]
impl LedgerClient for Ledger {
    async fn submit_signed_operation(
        &self,
        operation: &SignedOperation,
    ) -> Result<OpId, ClientError> {
        Ok(self.submit(operation)?.op_id)
    }

    async fn fetch_record(&self, address: &RecordAddress) -> Result<Option<Record>, ClientError> {
        Ok(self.record(address)?)
    }

    async fn fetch_transaction_history(
        &self,
        address: &RecordAddress,
    ) -> Result<Vec<TransactionSummary>, ClientError> {
        let mut all = Vec::new();
        let mut before = None;
        loop {
            let page = self.history(address, before, MAX_HISTORY_PAGE)?;
            let Some(last) = page.last() else { break };
            before = Some(last.slot);
            let full = page.len() == MAX_HISTORY_PAGE;
            all.extend(page);
            if !full {
                break;
            }
        }
        Ok(all)
    }

    async fn fetch_transaction_logs(
        &self,
        op_id: &OpId,
    ) -> Result<Option<Vec<String>>, ClientError> {
        Ok(self.transaction(op_id)?.and_then(|tx| tx.logs))
    }
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn submit_signed_operation(
        &self,
        operation: &SignedOperation,
    ) -> Result<OpId, ClientError> {
        (**self).submit_signed_operation(operation).await
    }

    async fn fetch_record(&self, address: &RecordAddress) -> Result<Option<Record>, ClientError> {
        (**self).fetch_record(address).await
    }

    async fn fetch_transaction_history(
        &self,
        address: &RecordAddress,
    ) -> Result<Vec<TransactionSummary>, ClientError> {
        (**self).fetch_transaction_history(address).await
    }

    async fn fetch_transaction_logs(
        &self,
        op_id: &OpId,
    ) -> Result<Option<Vec<String>>, ClientError> {
        (**self).fetch_transaction_logs(op_id).await
    }
}
