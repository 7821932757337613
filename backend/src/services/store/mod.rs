//! Persistence seam for the ledger engine
//!
//! The engine only talks to a [`LedgerStore`]. Production uses
//! [`PgLedgerStore`]; tests use an in-memory store with the same semantics.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ActivityRecord, EntryFilter, LedgerEntry, LotBalance, NewLedgerEntry, ProductBalance};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgLedgerStore;

/// Set of entries a balance is folded over
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BalanceScope {
    /// Every entry of a product in a warehouse
    Warehouse { product_id: Uuid, warehouse_id: Uuid },
    /// Every entry carrying a lot number
    Lot { lot_id: String },
    /// Entries of one lot of a product in a warehouse
    WarehouseLot {
        product_id: Uuid,
        warehouse_id: Uuid,
        lot_id: String,
    },
}

impl BalanceScope {
    /// Narrowest scope an entry contributes to
    pub fn of_entry(entry: &NewLedgerEntry) -> Self {
        match &entry.lot_id {
            Some(lot_id) => BalanceScope::WarehouseLot {
                product_id: entry.product_id,
                warehouse_id: entry.warehouse_id,
                lot_id: lot_id.clone(),
            },
            None => BalanceScope::Warehouse {
                product_id: entry.product_id,
                warehouse_id: entry.warehouse_id,
            },
        }
    }

    /// `(product, warehouse, lot)` filter triple
    pub fn parts(&self) -> (Option<Uuid>, Option<Uuid>, Option<&str>) {
        match self {
            BalanceScope::Warehouse {
                product_id,
                warehouse_id,
            } => (Some(*product_id), Some(*warehouse_id), None),
            BalanceScope::Lot { lot_id } => (None, None, Some(lot_id.as_str())),
            BalanceScope::WarehouseLot {
                product_id,
                warehouse_id,
                lot_id,
            } => (Some(*product_id), Some(*warehouse_id), Some(lot_id.as_str())),
        }
    }

    /// Key writers serialize on. Lots are keyed by lot number alone so that two
    /// writers drawing the same fresh lot number also collide.
    pub fn lock_key(&self) -> String {
        match self {
            BalanceScope::Warehouse {
                product_id,
                warehouse_id,
            } => format!("ledger:pw:{}:{}", product_id, warehouse_id),
            BalanceScope::Lot { lot_id } | BalanceScope::WarehouseLot { lot_id, .. } => {
                format!("ledger:lot:{}", lot_id)
            }
        }
    }

    pub fn contains(&self, entry: &LedgerEntry) -> bool {
        let (product_id, warehouse_id, lot_id) = self.parts();
        product_id.map_or(true, |id| entry.product_id == id)
            && warehouse_id.map_or(true, |id| entry.warehouse_id == id)
            && lot_id.map_or(true, |lot| entry.lot_id.as_deref() == Some(lot))
    }
}

/// Conditions checked atomically with an append
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendGuard {
    /// The entry's scope balance must cover its quantity
    pub require_cover: bool,
    /// This entry must not have been undone already
    pub not_undone: Option<Uuid>,
    /// The entry's lot number must not be in use yet
    pub fresh_lot: bool,
}

impl AppendGuard {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn covered() -> Self {
        Self {
            require_cover: true,
            ..Self::default()
        }
    }

    pub fn fresh_lot() -> Self {
        Self {
            fresh_lot: true,
            ..Self::default()
        }
    }
}

/// Durable, append-only ledger storage plus read access to the registries.
///
/// `append` must evaluate its guard and write the entry together with its
/// activity record as one atomic unit that is safe across processes. Guard
/// failures are reported as `InsufficientStock` (cover) or `Conflict`
/// (`lotId` for a taken lot number, `entryId` for a repeated undo).
pub trait LedgerStore: Send + Sync {
    /// Barcode of a product, `None` if the product does not exist
    fn product_barcode(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<String>>> + Send;

    fn product_by_barcode(
        &self,
        barcode: &str,
    ) -> impl Future<Output = AppResult<Option<Uuid>>> + Send;

    fn warehouse_exists(&self, warehouse_id: Uuid) -> impl Future<Output = AppResult<bool>> + Send;

    fn scale_exists(&self, scale_id: Uuid) -> impl Future<Output = AppResult<bool>> + Send;

    /// Product and warehouse of the first entry of a lot
    fn lot_placement(
        &self,
        lot_id: &str,
    ) -> impl Future<Output = AppResult<Option<(Uuid, Uuid)>>> + Send;

    fn find_entry(
        &self,
        entry_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<LedgerEntry>>> + Send;

    /// The undo entry reversing `entry_id`, if any
    fn find_undo(
        &self,
        entry_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<LedgerEntry>>> + Send;

    fn balance(&self, scope: &BalanceScope) -> impl Future<Output = AppResult<Decimal>> + Send;

    /// Balances of every lot of a product, exhausted lots included,
    /// most recently updated first
    fn lot_balances(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> impl Future<Output = AppResult<Vec<LotBalance>>> + Send;

    /// Entries matching `filter`, newest first, at most `filter.effective_limit()`
    fn list_entries(
        &self,
        filter: &EntryFilter,
    ) -> impl Future<Output = AppResult<Vec<LedgerEntry>>> + Send;

    /// Product/warehouse pairs whose balance is below `threshold`, lowest first
    fn balances_below(
        &self,
        threshold: Decimal,
    ) -> impl Future<Output = AppResult<Vec<ProductBalance>>> + Send;

    fn recent_activity(
        &self,
        limit: u32,
    ) -> impl Future<Output = AppResult<Vec<ActivityRecord>>> + Send;

    fn append(
        &self,
        entry: NewLedgerEntry,
        guard: AppendGuard,
    ) -> impl Future<Output = AppResult<LedgerEntry>> + Send;
}

impl<T: LedgerStore> LedgerStore for Arc<T> {
    fn product_barcode(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<String>>> + Send {
        (**self).product_barcode(product_id)
    }

    fn product_by_barcode(
        &self,
        barcode: &str,
    ) -> impl Future<Output = AppResult<Option<Uuid>>> + Send {
        (**self).product_by_barcode(barcode)
    }

    fn warehouse_exists(&self, warehouse_id: Uuid) -> impl Future<Output = AppResult<bool>> + Send {
        (**self).warehouse_exists(warehouse_id)
    }

    fn scale_exists(&self, scale_id: Uuid) -> impl Future<Output = AppResult<bool>> + Send {
        (**self).scale_exists(scale_id)
    }

    fn lot_placement(
        &self,
        lot_id: &str,
    ) -> impl Future<Output = AppResult<Option<(Uuid, Uuid)>>> + Send {
        (**self).lot_placement(lot_id)
    }

    fn find_entry(
        &self,
        entry_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<LedgerEntry>>> + Send {
        (**self).find_entry(entry_id)
    }

    fn find_undo(
        &self,
        entry_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<LedgerEntry>>> + Send {
        (**self).find_undo(entry_id)
    }

    fn balance(&self, scope: &BalanceScope) -> impl Future<Output = AppResult<Decimal>> + Send {
        (**self).balance(scope)
    }

    fn lot_balances(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> impl Future<Output = AppResult<Vec<LotBalance>>> + Send {
        (**self).lot_balances(product_id, warehouse_id)
    }

    fn list_entries(
        &self,
        filter: &EntryFilter,
    ) -> impl Future<Output = AppResult<Vec<LedgerEntry>>> + Send {
        (**self).list_entries(filter)
    }

    fn balances_below(
        &self,
        threshold: Decimal,
    ) -> impl Future<Output = AppResult<Vec<ProductBalance>>> + Send {
        (**self).balances_below(threshold)
    }

    fn recent_activity(
        &self,
        limit: u32,
    ) -> impl Future<Output = AppResult<Vec<ActivityRecord>>> + Send {
        (**self).recent_activity(limit)
    }

    fn append(
        &self,
        entry: NewLedgerEntry,
        guard: AppendGuard,
    ) -> impl Future<Output = AppResult<LedgerEntry>> + Send {
        (**self).append(entry, guard)
    }
}
