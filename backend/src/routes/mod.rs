//! Route definitions for the stock ledger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, external_api_middleware},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    // Operator routes (JWT)
    let protected = Router::new()
        .merge(stock_routes())
        .nest("/ledger", ledger_routes())
        .nest("/lots", lot_routes())
        .merge(report_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
        // Integration routes (API key)
        .nest("/external", external_routes(state))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/stock/in", post(handlers::stock_in))
        .route("/stock/out", post(handlers::stock_out))
        .route("/balance", get(handlers::get_balance))
}

fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_entries))
        .route("/movements", post(handlers::record_movement))
        .route("/:entry_id", get(handlers::get_entry))
        .route("/:entry_id/undo", post(handlers::undo_entry))
}

fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/available", get(handlers::list_available_lots))
        .route("/resolve", get(handlers::resolve_label))
        .route("/:lot_id/balance", get(handlers::get_lot_balance))
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/low-stock", get(handlers::low_stock_report))
        .route("/activities", get(handlers::list_activities))
}

fn external_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stock-in", post(handlers::external_stock_in))
        .route("/inventory", get(handlers::external_inventory))
        .route_layer(middleware::from_fn_with_state(state, external_api_middleware))
}
