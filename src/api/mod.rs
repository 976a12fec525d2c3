// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    program::{Receipt, Record, SignedOperation, TransactionSummary},
    state::AppState,
};

pub mod health;
pub mod operations;
pub mod records;
pub mod transactions;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/operations", post(operations::submit_operation))
        .route("/records/{address}", get(records::get_record))
        .route(
            "/authorities/{authority}/records",
            get(records::list_records),
        )
        .route(
            "/addresses/{address}/transactions",
            get(transactions::list_transactions),
        )
        .route("/transactions/{op_id}/logs", get(transactions::get_logs))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        operations::submit_operation,
        records::get_record,
        records::list_records,
        transactions::list_transactions,
        transactions::get_logs
    ),
    components(
        schemas(
            SignedOperation,
            Receipt,
            Record,
            TransactionSummary,
            records::RecordListResponse,
            transactions::HistoryResponse,
            transactions::LogsResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Operations", description = "Signed record operations"),
        (name = "Records", description = "Record state lookups"),
        (name = "Transactions", description = "Address history and transaction logs")
    )
)]
struct ApiDoc;
