//! HTTP handlers for integrations authenticated by API key

use axum::{extract::State, http::StatusCode, Json};

use super::{ledger_service, BalanceQuery};
use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::CurrentActor;
use crate::models::{ProductBalance, StockInReceipt, StockInRequest};
use crate::AppState;

/// Stock-in pushed by a scale or another system
pub async fn external_stock_in(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AppJson(input): AppJson<StockInRequest>,
) -> AppResult<(StatusCode, Json<StockInReceipt>)> {
    let receipt = ledger_service(&state).record_stock_in(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn external_inventory(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BalanceQuery>,
) -> AppResult<Json<ProductBalance>> {
    let balance = ledger_service(&state)
        .get_balance(query.product_id, query.warehouse_id)
        .await?;
    Ok(Json(ProductBalance {
        product_id: query.product_id,
        warehouse_id: query.warehouse_id,
        balance,
    }))
}
