//! Property-based tests for LedgerService over the in-memory store.
//!
//! Random stock-in, stock-out and undo sequences go through the real engine
//! and its guarded append. After every step:
//! - no lot and no product/warehouse pair is below zero
//! - a rejected movement leaves the ledger untouched
//! - each lot balance equals the sign-rule sum of its stored entries
//! - no entry is reversed twice and undo entries are never reversed

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::ledger::LedgerService;
use super::store::memory::MemoryLedgerStore;
use crate::error::AppError;
use crate::models::{LedgerEntry, StockInRequest, StockOutRequest};
use shared::balance::entries_balance;
use shared::Actor;

#[derive(Debug, Clone)]
enum Op {
    /// Stock-in; `Some(i)` adds to an existing lot, `None` opens a new one
    In(Decimal, Option<usize>),
    Out(Decimal, usize),
    Undo(usize),
}

/// Quantities from 0.1 to 1,000.0
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (quantity(), prop::option::of(0usize..8)).prop_map(|(q, lot)| Op::In(q, lot)),
        (quantity(), 0usize..8).prop_map(|(q, lot)| Op::Out(q, lot)),
        (0usize..64).prop_map(Op::Undo),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

struct Harness {
    service: LedgerService<Arc<MemoryLedgerStore>>,
    store: Arc<MemoryLedgerStore>,
    product_id: Uuid,
    warehouse_id: Uuid,
    actor: Actor,
    lots: Vec<String>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let product_id = store.add_product("6260001234567");
        let warehouse_id = store.add_warehouse();
        Self {
            service: LedgerService::new(Arc::clone(&store)),
            store,
            product_id,
            warehouse_id,
            actor: Actor::user("user-1"),
            lots: Vec::new(),
        }
    }

    /// Apply one op; `None` when there was no lot or entry to act on
    async fn apply(&mut self, op: &Op) -> Option<Result<LedgerEntry, AppError>> {
        match op {
            Op::In(quantity, lot) => {
                let lot_id = lot.and_then(|i| self.lots.get(i % self.lots.len().max(1)).cloned());
                let request = StockInRequest {
                    product_id: self.product_id,
                    warehouse_id: self.warehouse_id,
                    quantity: *quantity,
                    weight: None,
                    scale_id: None,
                    lot_id,
                    source: None,
                };
                let result = self.service.record_stock_in(request, &self.actor).await;
                if let Ok(receipt) = &result {
                    if receipt.lot_created {
                        self.lots.push(receipt.lot_id.clone());
                    }
                }
                Some(result.map(|receipt| receipt.entry))
            }
            Op::Out(quantity, lot) => {
                let lot_id = self.lots.get(lot % self.lots.len().max(1))?.clone();
                let request = StockOutRequest {
                    product_id: self.product_id,
                    warehouse_id: self.warehouse_id,
                    lot_id,
                    quantity: *quantity,
                    weight: None,
                };
                Some(self.service.record_stock_out(request, &self.actor).await)
            }
            Op::Undo(index) => {
                let entries = self.store.entries();
                let target = entries.get(index % entries.len().max(1))?;
                Some(self.service.record_undo(target.id, &self.actor).await)
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balances stay non-negative and rejected movements never reach the ledger
    #[test]
    fn prop_engine_never_overdraws(ops in prop::collection::vec(op(), 1..40)) {
        runtime().block_on(async {
            let mut harness = Harness::new();

            for op in &ops {
                let before = harness.store.entries().len();
                let Some(result) = harness.apply(op).await else {
                    continue;
                };
                let after = harness.store.entries().len();

                match result {
                    Ok(_) => {
                        prop_assert_eq!(after, before + 1);
                    }
                    Err(err) => {
                        prop_assert_eq!(after, before, "rejected {:?} changed the ledger", op);
                        if let Op::Out(..) = op {
                            prop_assert!(
                                matches!(err, AppError::InsufficientStock { .. }),
                                "expected InsufficientStock, got {:?}",
                                err
                            );
                        }
                    }
                }

                let warehouse = harness
                    .service
                    .get_balance(harness.product_id, harness.warehouse_id)
                    .await
                    .unwrap();
                prop_assert!(warehouse >= Decimal::ZERO);

                let entries = harness.store.entries();
                for lot in &harness.lots {
                    let balance = harness.service.get_lot_balance(lot).await.unwrap();
                    prop_assert!(balance >= Decimal::ZERO, "lot {} went to {}", lot, balance);
                    let folded = entries_balance(
                        entries.iter().filter(|e| e.lot_id.as_deref() == Some(lot.as_str())),
                    )
                    .unwrap();
                    prop_assert_eq!(balance, folded);
                }
            }
            Ok(())
        })?;
    }

    /// Each entry is reversed at most once and undo entries are never reversed
    #[test]
    fn prop_engine_undoes_at_most_once(ops in prop::collection::vec(op(), 1..40)) {
        runtime().block_on(async {
            let mut harness = Harness::new();
            for op in &ops {
                let _ = harness.apply(op).await;
            }

            let entries = harness.store.entries();
            for entry in &entries {
                let reversals = entries
                    .iter()
                    .filter(|u| u.reverses_entry_id == Some(entry.id))
                    .count();
                prop_assert!(reversals <= 1);
                if entry.kind.is_undo() {
                    prop_assert_eq!(reversals, 0);
                }
            }
            Ok(())
        })?;
    }
}
