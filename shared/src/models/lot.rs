//! Lot and label models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LedgerEntry;

/// Remaining quantity of one lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotBalance {
    pub lot_id: String,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub balance: Decimal,
    /// Timestamp of the newest entry in the lot
    pub last_updated_at: DateTime<Utc>,
}

/// Result of a stock-in: the entry plus its lot and label codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInReceipt {
    pub entry: LedgerEntry,
    pub lot_id: String,
    /// True when the lot number was generated by this stock-in
    pub lot_created: bool,
    pub entry_barcode: String,
    pub entry_qr: String,
}

/// A scanned label resolved to its lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLabel {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot_id: String,
    pub balance: Decimal,
}
