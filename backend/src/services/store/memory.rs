//! In-memory ledger store for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{AppendGuard, BalanceScope, LedgerStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ledger_activity_details, ActivityRecord, EntryFilter, LedgerEntry, LotBalance,
    NewLedgerEntry, ProductBalance, LEDGER_ENTITY,
};
use shared::balance::{self, covers, entries_balance, BalanceOverflow};

#[derive(Default)]
struct State {
    products: HashMap<Uuid, String>,
    warehouses: HashSet<Uuid>,
    scales: HashSet<Uuid>,
    entries: Vec<LedgerEntry>,
    activities: Vec<ActivityRecord>,
    ticks: i64,
}

impl State {
    /// Strictly increasing timestamps so recency ordering is deterministic
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc.with_ymd_and_hms(2024, 3, 7, 8, 0, 0).unwrap()
            + Duration::seconds(self.ticks)
    }

    fn balance(&self, scope: &BalanceScope) -> AppResult<Decimal> {
        Ok(entries_balance(
            self.entries.iter().filter(|e| scope.contains(e)),
        )?)
    }
}

/// Ledger store keeping everything behind one mutex.
///
/// The lock is never held across an await, so guard checks and the append
/// happen atomically just like the Postgres transaction.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_product(&self, barcode: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().products.insert(id, barcode.to_string());
        id
    }

    pub fn add_warehouse(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().warehouses.insert(id);
        id
    }

    pub fn add_scale(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().scales.insert(id);
        id
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().entries.clone()
    }
}

impl LedgerStore for MemoryLedgerStore {
    async fn product_barcode(&self, product_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.lock().products.get(&product_id).cloned())
    }

    async fn product_by_barcode(&self, barcode: &str) -> AppResult<Option<Uuid>> {
        Ok(self
            .lock()
            .products
            .iter()
            .find(|(_, code)| code.as_str() == barcode)
            .map(|(id, _)| *id))
    }

    async fn warehouse_exists(&self, warehouse_id: Uuid) -> AppResult<bool> {
        Ok(self.lock().warehouses.contains(&warehouse_id))
    }

    async fn scale_exists(&self, scale_id: Uuid) -> AppResult<bool> {
        Ok(self.lock().scales.contains(&scale_id))
    }

    async fn lot_placement(&self, lot_id: &str) -> AppResult<Option<(Uuid, Uuid)>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .find(|e| e.lot_id.as_deref() == Some(lot_id))
            .map(|e| (e.product_id, e.warehouse_id)))
    }

    async fn find_entry(&self, entry_id: Uuid) -> AppResult<Option<LedgerEntry>> {
        Ok(self.lock().entries.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn find_undo(&self, entry_id: Uuid) -> AppResult<Option<LedgerEntry>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .find(|e| e.reverses_entry_id == Some(entry_id))
            .cloned())
    }

    async fn balance(&self, scope: &BalanceScope) -> AppResult<Decimal> {
        self.lock().balance(scope)
    }

    async fn lot_balances(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<LotBalance>> {
        let state = self.lock();
        Ok(balance::lot_balances(state.entries.iter().filter(|e| {
            e.product_id == product_id && warehouse_id.map_or(true, |w| e.warehouse_id == w)
        }))?)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> AppResult<Vec<LedgerEntry>> {
        let state = self.lock();
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn balances_below(&self, threshold: Decimal) -> AppResult<Vec<ProductBalance>> {
        let state = self.lock();
        let mut totals: HashMap<(Uuid, Uuid), Decimal> = HashMap::new();
        for entry in &state.entries {
            let total = totals
                .entry((entry.product_id, entry.warehouse_id))
                .or_default();
            *total = total
                .checked_add(entry.signed_quantity())
                .ok_or(BalanceOverflow)?;
        }

        let mut low: Vec<ProductBalance> = totals
            .into_iter()
            .filter(|(_, balance)| *balance < threshold)
            .map(|((product_id, warehouse_id), balance)| ProductBalance {
                product_id,
                warehouse_id,
                balance,
            })
            .collect();
        low.sort_by(|a, b| {
            a.balance
                .cmp(&b.balance)
                .then(a.product_id.cmp(&b.product_id))
                .then(a.warehouse_id.cmp(&b.warehouse_id))
        });
        Ok(low)
    }

    async fn recent_activity(&self, limit: u32) -> AppResult<Vec<ActivityRecord>> {
        Ok(self
            .lock()
            .activities
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn append(&self, entry: NewLedgerEntry, guard: AppendGuard) -> AppResult<LedgerEntry> {
        let mut state = self.lock();
        let scope = BalanceScope::of_entry(&entry);

        if guard.fresh_lot
            && state
                .entries
                .iter()
                .any(|e| e.lot_id.is_some() && e.lot_id == entry.lot_id)
        {
            return Err(AppError::conflict("lotId", "lot number already in use"));
        }

        if let Some(original_id) = guard.not_undone {
            if state
                .entries
                .iter()
                .any(|e| e.reverses_entry_id == Some(original_id))
            {
                return Err(AppError::conflict("entryId", "entry has already been undone"));
            }
        }

        if guard.require_cover {
            let available = state.balance(&scope)?;
            if !covers(available, entry.quantity) {
                return Err(AppError::InsufficientStock { available });
            }
        }

        let created = LedgerEntry {
            id: Uuid::new_v4(),
            kind: entry.kind,
            product_id: entry.product_id,
            warehouse_id: entry.warehouse_id,
            scale_id: entry.scale_id,
            lot_id: entry.lot_id,
            quantity: entry.quantity,
            weight: entry.weight,
            source: entry.source,
            reverses_entry_id: entry.reverses_entry_id,
            created_at: state.next_timestamp(),
            created_by: entry.created_by,
        };

        let activity = ActivityRecord {
            id: Uuid::new_v4(),
            actor: created.created_by.clone(),
            action: created.kind.as_str().to_string(),
            entity_type: LEDGER_ENTITY.to_string(),
            entity_id: created.id,
            details: ledger_activity_details(&created),
            created_at: created.created_at,
        };

        state.entries.push(created.clone());
        state.activities.push(activity);

        Ok(created)
    }
}
