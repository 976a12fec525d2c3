// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record lookups.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    program::{Authority, ProgramError, Record, RecordAddress},
    state::AppState,
};

/// Records owned by one authority.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordListResponse {
    pub records: Vec<Record>,
}

/// Get a record by address.
#[utoipa::path(
    get,
    path = "/v1/records/{address}",
    tag = "Records",
    params(
        ("address" = String, Path, description = "Record address (64 hex chars)")
    ),
    responses(
        (status = 200, description = "Record state", body = Record),
        (status = 400, description = "Malformed address"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Record>, ApiError> {
    let address: RecordAddress = address
        .parse()
        .map_err(|e| ApiError::bad_request(format!("Invalid record address: {e}")))?;

    state
        .ledger
        .record(&address)?
        .map(Json)
        .ok_or_else(|| ProgramError::RecordNotFound.into())
}

/// List an authority's records, newest first.
#[utoipa::path(
    get,
    path = "/v1/authorities/{authority}/records",
    tag = "Records",
    params(
        ("authority" = String, Path, description = "Compressed secp256k1 public key (66 hex chars)")
    ),
    responses(
        (status = 200, description = "Records of the authority", body = RecordListResponse),
        (status = 400, description = "Malformed authority")
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Path(authority): Path<String>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let authority: Authority = authority
        .parse()
        .map_err(|e| ApiError::bad_request(format!("Invalid authority: {e}")))?;

    let records = state.ledger.records_by_authority(&authority)?;
    Ok(Json(RecordListResponse { records }))
}
