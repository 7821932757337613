//! HTTP handlers for the ledger, balances and lots

use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger_service;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::CurrentActor;
use crate::models::{
    EntryFilter, LedgerEntry, LotBalance, MovementOutcome, ProductBalance, ResolvedLabel,
    StockMovement,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceQuery {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableLotsQuery {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotBalanceResponse {
    pub lot_id: String,
    pub balance: Decimal,
}

/// Apply a tagged movement
pub async fn record_movement(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AppJson(movement): AppJson<StockMovement>,
) -> AppResult<(StatusCode, Json<MovementOutcome>)> {
    let outcome = ledger_service(&state).record(movement, &actor).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Ledger history, newest first
pub async fn list_entries(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<EntryFilter>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let entries = ledger_service(&state).list_entries(&filter).await?;
    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<Uuid>,
) -> AppResult<Json<LedgerEntry>> {
    let entry = ledger_service(&state).entry(entry_id).await?;
    Ok(Json(entry))
}

/// Reverse an entry
pub async fn undo_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AppPath(entry_id): AppPath<Uuid>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let entry = ledger_service(&state).record_undo(entry_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Balance of a product in a warehouse
pub async fn get_balance(
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

pub async fn list_available_lots(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AvailableLotsQuery>,
) -> AppResult<Json<Vec<LotBalance>>> {
    let lots = ledger_service(&state)
        .list_available_lots(query.product_id, query.warehouse_id)
        .await?;
    Ok(Json(lots))
}

pub async fn get_lot_balance(
    State(state): State<AppState>,
    AppPath(lot_id): AppPath<String>,
) -> AppResult<Json<LotBalanceResponse>> {
    let balance = ledger_service(&state).get_lot_balance(&lot_id).await?;
    Ok(Json(LotBalanceResponse { lot_id, balance }))
}

/// Resolve a scanned label to its lot
pub async fn resolve_label(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ResolveQuery>,
) -> AppResult<Json<ResolvedLabel>> {
    let resolved = ledger_service(&state).resolve_label(&query.code).await?;
    Ok(Json(resolved))
}
