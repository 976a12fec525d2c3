// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address history and transaction logs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    ledger::MAX_HISTORY_PAGE,
    program::{OpId, RecordAddress, TransactionSummary},
    state::AppState,
};

const DEFAULT_PAGE: usize = 100;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Only transactions with a slot strictly below this one
    pub before: Option<u64>,
    /// Maximum number of results (default: 100, max: 1000)
    #[param(default = 100)]
    pub limit: Option<usize>,
}

/// One page of an address's history, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub transactions: Vec<TransactionSummary>,
}

/// Logs of one transaction.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    #[schema(value_type = String)]
    pub op_id: OpId,
    pub slot: u64,
    /// `null` once the node's log retention dropped them
    pub logs: Option<Vec<String>>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List transactions that touched an address.
#[utoipa::path(
    get,
    path = "/v1/addresses/{address}/transactions",
    tag = "Transactions",
    params(
        ("address" = String, Path, description = "Record address (64 hex chars)"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "History page", body = HistoryResponse),
        (status = 400, description = "Malformed address")
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let address: RecordAddress = address
        .parse()
        .map_err(|e| ApiError::bad_request(format!("Invalid record address: {e}")))?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).min(MAX_HISTORY_PAGE);

    let transactions = state.ledger.history(&address, query.before, limit)?;
    Ok(Json(HistoryResponse { transactions }))
}

/// Fetch one transaction's log lines.
#[utoipa::path(
    get,
    path = "/v1/transactions/{op_id}/logs",
    tag = "Transactions",
    params(
        ("op_id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Transaction logs", body = LogsResponse),
        (status = 404, description = "Unknown transaction")
    )
)]
pub async fn get_logs(
    State(state): State<AppState>,
    Path(op_id): Path<String>,
) -> Result<Json<LogsResponse>, ApiError> {
    let op_id = OpId::new(op_id);
    let tx = state
        .ledger
        .transaction(&op_id)?
        .ok_or_else(|| ApiError::not_found(format!("Transaction {op_id} not found")))?;

    Ok(Json(LogsResponse {
        op_id: tx.op_id,
        slot: tx.slot,
        logs: tx.logs,
    }))
}
