// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::program::{ErrorClass, ProgramError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Machine-readable code, e.g. `invalid_fragment_index`
    pub error_code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
    }
}

/// HTTP status for a program rejection.
fn program_status(err: &ProgramError) -> StatusCode {
    match (err, err.class()) {
        (ProgramError::RecordNotFound, _) => StatusCode::NOT_FOUND,
        (_, ErrorClass::Validation) => StatusCode::BAD_REQUEST,
        (_, ErrorClass::Sequence | ErrorClass::State) => StatusCode::CONFLICT,
        (_, ErrorClass::Authorization) => StatusCode::FORBIDDEN,
        (_, ErrorClass::Integrity) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<ProgramError> for ApiError {
    fn from(err: ProgramError) -> Self {
        Self::new(program_status(&err), err.error_code(), err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Program(e) => e.into(),
            LedgerError::DuplicateOperation(op_id) => Self::new(
                StatusCode::CONFLICT,
                "duplicate_operation",
                format!("Operation {op_id} already committed"),
            ),
            other => {
                tracing::error!(error = %other, "Ledger storage failure");
                Self::internal(format!("Ledger storage failure: {other}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
