//! Ledger engine: records stock movements and derives balances
//!
//! Every write validates its payload, checks the registries, then issues one
//! guarded append to the store. Balances are never stored; they are folded
//! from the ledger on every read.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::store::{AppendGuard, BalanceScope, LedgerStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityRecord, EntryFilter, EntryKind, EntrySource, LedgerEntry, LotBalance, MovementOutcome,
    NewLedgerEntry, ProductBalance, ResolvedLabel, StockInReceipt, StockInRequest, StockMovement,
    StockOutRequest,
};
use shared::balance::retain_available;
use shared::codes::{self, LabelCode, BASE36_ALPHABET, LOT_SUFFIX_LEN};
use shared::Actor;

/// Attempts at drawing an unused lot number
pub const DEFAULT_LOT_NUMBER_ATTEMPTS: u32 = 5;

/// Activity records returned when no limit is given
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

/// Draw a fresh lot number for `now` (UTC date)
pub fn generate_lot_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix = codes::lot_suffix_from_indices(
        (0..LOT_SUFFIX_LEN).map(|_| rng.random_range(0..BASE36_ALPHABET.len())),
    );
    codes::format_lot_number(now.date_naive(), &suffix)
}

/// Ledger engine over a [`LedgerStore`]
#[derive(Clone)]
pub struct LedgerService<S> {
    store: S,
    lot_number_attempts: u32,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Create a new LedgerService instance
    pub fn new(store: S) -> Self {
        Self {
            store,
            lot_number_attempts: DEFAULT_LOT_NUMBER_ATTEMPTS,
        }
    }

    pub fn with_lot_number_attempts(mut self, attempts: u32) -> Self {
        self.lot_number_attempts = attempts.max(1);
        self
    }

    /// Apply any tagged movement
    pub async fn record(
        &self,
        movement: StockMovement,
        actor: &Actor,
    ) -> AppResult<MovementOutcome> {
        movement.check()?;

        match movement {
            StockMovement::StockIn(request) => self
                .record_stock_in(request, actor)
                .await
                .map(MovementOutcome::StockIn),
            StockMovement::StockOut(request) => self
                .record_stock_out(request, actor)
                .await
                .map(MovementOutcome::StockOut),
            StockMovement::Undo(request) => self
                .record_undo(request.entry_id, actor)
                .await
                .map(MovementOutcome::Undo),
        }
    }

    /// Receive goods, into an existing lot or a freshly numbered one
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id, warehouse_id = %request.warehouse_id))]
    pub async fn record_stock_in(
        &self,
        request: StockInRequest,
        actor: &Actor,
    ) -> AppResult<StockInReceipt> {
        request.check()?;

        let product_barcode = self
            .store
            .product_barcode(request.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        self.require_warehouse(request.warehouse_id).await?;
        if let Some(scale_id) = request.scale_id {
            if !self.store.scale_exists(scale_id).await? {
                return Err(AppError::NotFound("Scale".to_string()));
            }
        }

        let mut entry = NewLedgerEntry {
            kind: EntryKind::StockIn,
            product_id: request.product_id,
            warehouse_id: request.warehouse_id,
            scale_id: request.scale_id,
            lot_id: None,
            quantity: request.quantity,
            weight: request.weight,
            source: request.resolved_source(),
            reverses_entry_id: None,
            created_by: actor.to_string(),
        };

        let (created, lot_created) = match request.lot_id {
            Some(lot_id) => {
                self.require_lot_placement(&lot_id, request.product_id, request.warehouse_id)
                    .await?;
                entry.lot_id = Some(lot_id);
                (self.store.append(entry, AppendGuard::none()).await?, false)
            }
            None => (self.append_with_fresh_lot(entry).await?, true),
        };

        let lot_id = created.lot_id.clone().unwrap_or_default();
        tracing::info!(
            entry_id = %created.id,
            kind = %created.kind,
            lot_id = %lot_id,
            lot_created,
            "stock in recorded"
        );

        Ok(StockInReceipt {
            entry_barcode: codes::entry_barcode(&product_barcode, &lot_id),
            entry_qr: codes::entry_qr(created.product_id, &lot_id),
            lot_id,
            lot_created,
            entry: created,
        })
    }

    async fn append_with_fresh_lot(&self, mut entry: NewLedgerEntry) -> AppResult<LedgerEntry> {
        for attempt in 1..=self.lot_number_attempts {
            entry.lot_id = Some(generate_lot_number(Utc::now()));
            match self.store.append(entry.clone(), AppendGuard::fresh_lot()).await {
                Err(AppError::Conflict { resource, .. }) if resource == "lotId" => {
                    tracing::debug!(attempt, "lot number collision");
                }
                other => return other,
            }
        }

        Err(AppError::conflict(
            "lotId",
            "could not allocate an unused lot number",
        ))
    }

    /// Withdraw goods from a lot; refused when the lot does not hold enough
    #[tracing::instrument(skip(self, request), fields(lot_id = %request.lot_id))]
    pub async fn record_stock_out(
        &self,
        request: StockOutRequest,
        actor: &Actor,
    ) -> AppResult<LedgerEntry> {
        request.check()?;

        self.require_product(request.product_id).await?;
        self.require_warehouse(request.warehouse_id).await?;
        self.require_lot_placement(&request.lot_id, request.product_id, request.warehouse_id)
            .await?;

        let entry = NewLedgerEntry {
            kind: EntryKind::StockOut,
            product_id: request.product_id,
            warehouse_id: request.warehouse_id,
            scale_id: None,
            lot_id: Some(request.lot_id),
            quantity: request.quantity,
            weight: request.weight,
            source: EntrySource::Manual,
            reverses_entry_id: None,
            created_by: actor.to_string(),
        };

        let created = self.store.append(entry, AppendGuard::covered()).await?;
        tracing::info!(entry_id = %created.id, kind = %created.kind, quantity = %created.quantity, "stock out recorded");

        Ok(created)
    }

    /// Reverse a stock-in or stock-out with a compensating entry
    #[tracing::instrument(skip(self))]
    pub async fn record_undo(&self, entry_id: Uuid, actor: &Actor) -> AppResult<LedgerEntry> {
        let original = self.entry(entry_id).await?;

        let undo = NewLedgerEntry::undo_of(&original, actor.to_string())
            .ok_or_else(|| AppError::validation("entryId", "undo entries cannot be undone"))?;

        if self.store.find_undo(entry_id).await?.is_some() {
            return Err(AppError::conflict("entryId", "entry has already been undone"));
        }

        let guard = AppendGuard {
            require_cover: !undo.kind.is_inbound(),
            not_undone: Some(entry_id),
            fresh_lot: false,
        };

        let created = self.store.append(undo, guard).await?;
        tracing::info!(entry_id = %created.id, kind = %created.kind, reverses = %entry_id, "undo recorded");

        Ok(created)
    }

    /// Net quantity of a product in a warehouse
    pub async fn get_balance(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<Decimal> {
        self.store
            .balance(&BalanceScope::Warehouse {
                product_id,
                warehouse_id,
            })
            .await
    }

    pub async fn get_lot_balance(&self, lot_id: &str) -> AppResult<Decimal> {
        self.store
            .balance(&BalanceScope::Lot {
                lot_id: lot_id.to_string(),
            })
            .await
    }

    /// Lots of a product that still hold stock, most recently updated first
    pub async fn list_available_lots(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<LotBalance>> {
        let lots = self.store.lot_balances(product_id, warehouse_id).await?;
        tracing::debug!(lots = lots.len(), "lot balances loaded");
        Ok(retain_available(lots))
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> AppResult<Vec<LedgerEntry>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::validation("from", "from must not be after to"));
            }
        }
        self.store.list_entries(filter).await
    }

    pub async fn entry(&self, entry_id: Uuid) -> AppResult<LedgerEntry> {
        self.store
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ledger entry".to_string()))
    }

    /// Product/warehouse pairs holding less than `threshold`
    pub async fn low_stock(&self, threshold: Decimal) -> AppResult<Vec<ProductBalance>> {
        self.store.balances_below(threshold).await
    }

    pub async fn recent_activity(&self, limit: Option<u32>) -> AppResult<Vec<ActivityRecord>> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, EntryFilter::MAX_LIMIT);
        self.store.recent_activity(limit).await
    }

    /// Resolve a scanned QR payload or entry barcode to its lot
    #[tracing::instrument(skip(self))]
    pub async fn resolve_label(&self, code: &str) -> AppResult<ResolvedLabel> {
        let label = codes::parse_label(code)
            .ok_or_else(|| AppError::validation("code", "unrecognised label code"))?;

        let lot = match label {
            LabelCode::Qr {
                product_id,
                lot_number,
            } => {
                let product_id = Uuid::parse_str(&product_id)
                    .map_err(|_| AppError::validation("code", "invalid product id in QR code"))?;
                self.store
                    .lot_balances(product_id, None)
                    .await?
                    .into_iter()
                    .find(|lot| lot.lot_id == lot_number)
            }
            LabelCode::Barcode {
                product_barcode,
                lot_tail,
            } => {
                let product_id = self
                    .store
                    .product_by_barcode(&product_barcode)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
                // Several lots can share a tail; the most recently active wins
                self.store
                    .lot_balances(product_id, None)
                    .await?
                    .into_iter()
                    .find(|lot| codes::lot_tail(&lot.lot_id) == lot_tail)
            }
        };

        let lot = lot.ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
        Ok(ResolvedLabel {
            product_id: lot.product_id,
            warehouse_id: lot.warehouse_id,
            lot_id: lot.lot_id,
            balance: lot.balance,
        })
    }

    async fn require_product(&self, product_id: Uuid) -> AppResult<()> {
        match self.store.product_barcode(product_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Product".to_string())),
        }
    }

    async fn require_warehouse(&self, warehouse_id: Uuid) -> AppResult<()> {
        if self.store.warehouse_exists(warehouse_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Warehouse".to_string()))
        }
    }

    /// The lot must already exist for this product and warehouse
    async fn require_lot_placement(
        &self,
        lot_id: &str,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<()> {
        match self.store.lot_placement(lot_id).await? {
            Some(placement) if placement == (product_id, warehouse_id) => Ok(()),
            _ => Err(AppError::NotFound("Lot".to_string())),
        }
    }
}
