//! HTTP handlers for the stock ledger API

pub mod external;
pub mod health;
pub mod ledger;
pub mod reports;
pub mod stock;

pub use external::*;
pub use health::*;
pub use ledger::*;
pub use reports::*;
pub use stock::*;

use crate::services::{LedgerService, PgLedgerStore};
use crate::AppState;

/// Ledger engine over the pooled connection of this request's state
pub(crate) fn ledger_service(state: &AppState) -> LedgerService<PgLedgerStore> {
    LedgerService::new(PgLedgerStore::new(state.db.clone()))
        .with_lot_number_attempts(state.config.inventory.lot_number_attempts)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, response::Response, Router};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{AppState, Config};

    /// State over a lazy pool; requests rejected at extraction never touch it
    pub fn state() -> AppState {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        AppState {
            db,
            config: Arc::new(config),
        }
    }

    pub async fn send(app: Router, request: Request<Body>) -> (Response, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (Response::from_parts(parts, Body::empty()), json)
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
