// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! [`LedgerClient`] over a remote node's JSON API.
//!
//! Program rejections arrive as `{ "error", "error_code" }` bodies and are
//! mapped back to [`ProgramError`] so callers see the same error whether the
//! ledger is local or remote.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{ClientError, LedgerClient, LogCache};
use crate::ledger::MAX_HISTORY_PAGE;
use crate::program::{
    Authority, OpId, ProgramError, Receipt, Record, RecordAddress, SignedOperation,
    TransactionSummary,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordsBody {
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    transactions: Vec<TransactionSummary>,
}

#[derive(Debug, Deserialize)]
struct LogsBody {
    logs: Option<Vec<String>>,
}

/// HTTP client for a ledger node.
pub struct HttpLedgerClient {
    base_url: Url,
    http: Client,
    log_cache: Option<LogCache>,
}

impl HttpLedgerClient {
    /// Client for the node at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Transport(format!("invalid ledger URL: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            log_cache: None,
        })
    }

    /// Cache fetched transaction logs in-process.
    pub fn with_log_cache(mut self, cache: LogCache) -> Self {
        self.log_cache = Some(cache);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Records owned by `authority`, newest first.
    pub async fn list_records(&self, authority: &Authority) -> Result<Vec<Record>, ClientError> {
        let url = self.url(&format!("v1/authorities/{authority}/records"))?;
        let response = self.send(self.http.get(url)).await?;
        let body: RecordsBody = decode(response).await?;
        Ok(body.records)
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid request path {path}: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Decode a success body or turn an error body into a [`ClientError`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

async fn error_from_response(status: StatusCode, response: Response) -> ClientError {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => match body.error_code.as_deref().and_then(ProgramError::from_code) {
            Some(program_error) => ClientError::Rejected(program_error),
            None => ClientError::Ledger(format!("HTTP {status}: {}", body.error)),
        },
        Err(_) => ClientError::Ledger(format!("HTTP {status}: {text}")),
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit_signed_operation(
        &self,
        operation: &SignedOperation,
    ) -> Result<OpId, ClientError> {
        let url = self.url("v1/operations")?;
        let response = self.send(self.http.post(url).json(operation)).await?;
        let receipt: Receipt = decode(response).await?;
        tracing::debug!(op_id = %receipt.op_id, slot = receipt.slot, "Operation accepted by node");
        Ok(receipt.op_id)
    }

    async fn fetch_record(&self, address: &RecordAddress) -> Result<Option<Record>, ClientError> {
        let url = self.url(&format!("v1/records/{address}"))?;
        let response = self.send(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn fetch_transaction_history(
        &self,
        address: &RecordAddress,
    ) -> Result<Vec<TransactionSummary>, ClientError> {
        let url = self.url(&format!("v1/addresses/{address}/transactions"))?;
        let limit = MAX_HISTORY_PAGE.to_string();

        let mut all = Vec::new();
        let mut before: Option<u64> = None;
        loop {
            let mut request = self.http.get(url.clone()).query(&[("limit", limit.as_str())]);
            if let Some(slot) = before {
                request = request.query(&[("before", slot)]);
            }
            let page: HistoryBody = decode(self.send(request).await?).await?;

            let Some(last) = page.transactions.last() else { break };
            before = Some(last.slot);
            let full = page.transactions.len() == MAX_HISTORY_PAGE;
            all.extend(page.transactions);
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
        if let Some(logs) = self.log_cache.as_ref().and_then(|c| c.get(op_id)) {
            return Ok(Some(logs));
        }

        let url = self.url(&format!("v1/transactions/{op_id}/logs"))?;
        let response = self.send(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LogsBody = decode(response).await?;

        if let (Some(cache), Some(logs)) = (&self.log_cache, &body.logs) {
            cache.put(op_id.clone(), logs.clone());
        }
        Ok(body.logs)
    }
}
