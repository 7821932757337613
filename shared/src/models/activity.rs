//! Audit trail models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LedgerEntry;

pub const LEDGER_ENTITY: &str = "INVENTORY_LEDGER";

/// One audit record, written together with the ledger entry it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Details payload recorded for a ledger append
pub fn ledger_activity_details(entry: &LedgerEntry) -> serde_json::Value {
    serde_json::json!({
        "quantity": entry.quantity,
        "weight": entry.weight,
        "lotId": entry.lot_id,
        "reversesEntryId": entry.reverses_entry_id,
    })
}
