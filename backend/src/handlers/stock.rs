//! HTTP handlers for stock-in and stock-out

use axum::{extract::State, http::StatusCode, Json};

use super::ledger_service;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::CurrentActor;
use crate::models::{LedgerEntry, StockInReceipt, StockInRequest, StockOutRequest};
use crate::AppState;

/// Receive goods into a warehouse
pub async fn stock_in(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AppJson(input): AppJson<StockInRequest>,
) -> AppResult<(StatusCode, Json<StockInReceipt>)> {
    let receipt = ledger_service(&state).record_stock_in(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Withdraw goods from a lot
pub async fn stock_out(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AppJson(input): AppJson<StockOutRequest>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let entry = ledger_service(&state).record_stock_out(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
