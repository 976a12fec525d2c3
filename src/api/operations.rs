// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operation submission.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiError,
    program::{Receipt, SignedOperation},
    state::AppState,
};

/// Submit a signed operation.
///
/// Returns once the operation is committed. A rejected operation leaves the
/// ledger untouched.
#[utoipa::path(
    post,
    path = "/v1/operations",
    tag = "Operations",
    request_body = SignedOperation,
    responses(
        (status = 201, description = "Operation committed", body = Receipt),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Signature or authority mismatch"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Sequence or state conflict")
    )
)]
pub async fn submit_operation(
    State(state): State<AppState>,
    Json(operation): Json<SignedOperation>,
) -> Result<(StatusCode, Json<Receipt>), ApiError> {
    let receipt = state.ledger.submit(&operation)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
