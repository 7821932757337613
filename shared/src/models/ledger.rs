//! Stock ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a ledger entry. The kind, not the stored quantity, carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    StockIn,
    StockOut,
    StockInUndo,
    StockOutUndo,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [
        EntryKind::StockIn,
        EntryKind::StockOut,
        EntryKind::StockInUndo,
        EntryKind::StockOutUndo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::StockIn => "STOCK_IN",
            EntryKind::StockOut => "STOCK_OUT",
            EntryKind::StockInUndo => "STOCK_IN_UNDO",
            EntryKind::StockOutUndo => "STOCK_OUT_UNDO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STOCK_IN" => Some(EntryKind::StockIn),
            "STOCK_OUT" => Some(EntryKind::StockOut),
            "STOCK_IN_UNDO" => Some(EntryKind::StockInUndo),
            "STOCK_OUT_UNDO" => Some(EntryKind::StockOutUndo),
            _ => None,
        }
    }

    /// Whether entries of this kind add to the balance
    pub fn is_inbound(&self) -> bool {
        matches!(self, EntryKind::StockIn | EntryKind::StockOutUndo)
    }

    pub fn is_undo(&self) -> bool {
        matches!(self, EntryKind::StockInUndo | EntryKind::StockOutUndo)
    }

    /// The compensating kind for an undo, `None` for undo kinds themselves
    pub fn undo_kind(&self) -> Option<EntryKind> {
        match self {
            EntryKind::StockIn => Some(EntryKind::StockInUndo),
            EntryKind::StockOut => Some(EntryKind::StockOutUndo),
            EntryKind::StockInUndo | EntryKind::StockOutUndo => None,
        }
    }

    /// Contribution of `quantity` to a balance under this kind
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        if self.is_inbound() {
            quantity
        } else {
            -quantity
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the quantity of a movement was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySource {
    #[default]
    Manual,
    Scale,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Manual => "MANUAL",
            EntrySource::Scale => "SCALE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MANUAL" => Some(EntrySource::Manual),
            "SCALE" => Some(EntrySource::Scale),
            _ => None,
        }
    }
}

/// One immutable stock movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub scale_id: Option<Uuid>,
    /// Lot number the entry belongs to
    pub lot_id: Option<String>,
    pub quantity: Decimal,
    pub weight: Option<Decimal>,
    pub source: EntrySource,
    /// Entry reversed by this one, set only on undo kinds
    pub reverses_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl LedgerEntry {
    /// Contribution of this entry to any balance it falls under
    pub fn signed_quantity(&self) -> Decimal {
        self.kind.signed(self.quantity)
    }
}

/// Entry about to be appended; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub kind: EntryKind,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub scale_id: Option<Uuid>,
    pub lot_id: Option<String>,
    pub quantity: Decimal,
    pub weight: Option<Decimal>,
    pub source: EntrySource,
    pub reverses_entry_id: Option<Uuid>,
    pub created_by: String,
}

impl NewLedgerEntry {
    /// Compensating entry for `original`, or `None` if `original` is itself an undo
    pub fn undo_of(original: &LedgerEntry, created_by: impl Into<String>) -> Option<Self> {
        let kind = original.kind.undo_kind()?;
        Some(Self {
            kind,
            product_id: original.product_id,
            warehouse_id: original.warehouse_id,
            scale_id: original.scale_id,
            lot_id: original.lot_id.clone(),
            quantity: original.quantity,
            weight: original.weight,
            source: original.source,
            reverses_entry_id: Some(original.id),
            created_by: created_by.into(),
        })
    }
}

/// Net quantity of a product in a warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBalance {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub balance: Decimal,
}

/// Ledger query filter; every field narrows the result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub lot_id: Option<String>,
    pub kind: Option<EntryKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl EntryFilter {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 500;

    /// Row limit clamped to `1..=MAX_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.product_id.map_or(true, |id| entry.product_id == id)
            && self.warehouse_id.map_or(true, |id| entry.warehouse_id == id)
            && self
                .lot_id
                .as_deref()
                .map_or(true, |lot| entry.lot_id.as_deref() == Some(lot))
            && self.kind.map_or(true, |kind| entry.kind == kind)
            && self.from.map_or(true, |from| entry.created_at >= from)
            && self.to.map_or(true, |to| entry.created_at <= to)
    }
}
