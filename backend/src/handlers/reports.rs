//! HTTP handlers for reports and the activity feed

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ledger_service;
use crate::error::AppResult;
use crate::extract::AppQuery;
use crate::models::{ActivityRecord, ProductBalance};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u32>,
}

/// Product/warehouse pairs below the low-stock threshold
pub async fn low_stock_report(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LowStockQuery>,
) -> AppResult<Json<Vec<ProductBalance>>> {
    let threshold = query
        .threshold
        .unwrap_or(state.config.inventory.low_stock_threshold);
    let report = ledger_service(&state).low_stock(threshold).await?;
    Ok(Json(report))
}

pub async fn list_activities(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityRecord>>> {
    let activities = ledger_service(&state).recent_activity(query.limit).await?;
    Ok(Json(activities))
}
