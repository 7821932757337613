//! Balance derivation from ledger entries
//!
//! Balances are never stored. They are folded from the append-only ledger with
//! the sign rule on [`EntryKind`]:
//!
//! - `STOCK_IN`, `STOCK_OUT_UNDO` add their quantity
//! - `STOCK_OUT`, `STOCK_IN_UNDO` subtract it

use std::collections::hash_map::{Entry, HashMap};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{EntryKind, LedgerEntry, LotBalance};

/// A running balance left the range `Decimal` can represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("balance exceeds the representable range")]
pub struct BalanceOverflow;

/// Fold `(kind, quantity)` pairs into a balance; empty input yields zero
pub fn fold_balance<I>(movements: I) -> Result<Decimal, BalanceOverflow>
where
    I: IntoIterator<Item = (EntryKind, Decimal)>,
{
    movements
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (kind, quantity)| {
            acc.checked_add(kind.signed(quantity)).ok_or(BalanceOverflow)
        })
}

/// Balance of the entries in `entries`
pub fn entries_balance<'a, I>(entries: I) -> Result<Decimal, BalanceOverflow>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    fold_balance(entries.into_iter().map(|e| (e.kind, e.quantity)))
}

/// Whether withdrawing `quantity` from `available` is allowed
pub fn covers(available: Decimal, quantity: Decimal) -> bool {
    quantity <= available
}

/// Per-lot balances of every lot in `entries`, including exhausted ones.
///
/// Entries without a lot are skipped. Output is ordered by most recent
/// activity first, lot id ascending on ties.
pub fn lot_balances<'a, I>(entries: I) -> Result<Vec<LotBalance>, BalanceOverflow>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut lots: HashMap<&'a str, LotBalance> = HashMap::new();

    for entry in entries {
        let Some(lot_id) = entry.lot_id.as_deref() else {
            continue;
        };
        match lots.entry(lot_id) {
            Entry::Occupied(mut slot) => {
                let lot = slot.get_mut();
                lot.balance = lot
                    .balance
                    .checked_add(entry.signed_quantity())
                    .ok_or(BalanceOverflow)?;
                if entry.created_at > lot.last_updated_at {
                    lot.last_updated_at = entry.created_at;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(LotBalance {
                    lot_id: lot_id.to_string(),
                    product_id: entry.product_id,
                    warehouse_id: entry.warehouse_id,
                    balance: entry.signed_quantity(),
                    last_updated_at: entry.created_at,
                });
            }
        }
    }

    let mut lots: Vec<LotBalance> = lots.into_values().collect();
    sort_by_recency(&mut lots);
    Ok(lots)
}

/// Lots that still hold stock, most recently updated first
pub fn available_lots<'a, I>(entries: I) -> Result<Vec<LotBalance>, BalanceOverflow>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    lot_balances(entries).map(retain_available)
}

/// Drop exhausted lots and restore recency order
pub fn retain_available(mut lots: Vec<LotBalance>) -> Vec<LotBalance> {
    lots.retain(|lot| lot.balance > Decimal::ZERO);
    sort_by_recency(&mut lots);
    lots
}

fn sort_by_recency(lots: &mut [LotBalance]) {
    lots.sort_by(|a, b| {
        b.last_updated_at
            .cmp(&a.last_updated_at)
            .then_with(|| a.lot_id.cmp(&b.lot_id))
    });
}
