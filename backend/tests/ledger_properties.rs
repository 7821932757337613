//! Stock ledger tests
//!
//! Tests for the ledger domain including:
//! - Balance folding with the entry sign rule
//! - Undo entries cancelling exactly what they reverse
//! - Available lot listing and label code derivations

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::balance::{available_lots, covers, entries_balance, fold_balance, lot_balances};
use shared::codes::{
    entry_barcode, entry_qr, format_lot_number, is_lot_number, lot_suffix_from_indices,
    parse_label, LabelCode,
};
use shared::{EntryKind, EntrySource, LedgerEntry, NewLedgerEntry};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn at(tick: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 7, 8, 0, 0).unwrap() + Duration::seconds(tick)
}

fn entry(kind: EntryKind, lot: &str, quantity: Decimal, tick: i64) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4(),
        kind,
        product_id: Uuid::from_u128(1),
        warehouse_id: Uuid::from_u128(2),
        scale_id: None,
        lot_id: Some(lot.to_string()),
        quantity,
        weight: None,
        source: EntrySource::Manual,
        reverses_entry_id: None,
        created_at: at(tick),
        created_by: "tester".to_string(),
    }
}

/// Apply an undo the way the engine does: mirror kind, same lot and quantity
fn undo(original: &LedgerEntry, tick: i64) -> Option<LedgerEntry> {
    let new = NewLedgerEntry::undo_of(original, "tester")?;
    Some(LedgerEntry {
        id: Uuid::new_v4(),
        kind: new.kind,
        product_id: new.product_id,
        warehouse_id: new.warehouse_id,
        scale_id: new.scale_id,
        lot_id: new.lot_id,
        quantity: new.quantity,
        weight: new.weight,
        source: new.source,
        reverses_entry_id: new.reverses_entry_id,
        created_at: at(tick),
        created_by: new.created_by,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Stock-in 100, stock-out 40, refused stock-out 1000
    #[test]
    fn test_receive_withdraw_refuse() {
        let mut ledger = vec![entry(EntryKind::StockIn, "L", dec("100"), 1)];
        ledger.push(entry(EntryKind::StockOut, "L", dec("40"), 2));
        assert_eq!(entries_balance(&ledger).unwrap(), dec("60"));

        let available = entries_balance(&ledger).unwrap();
        assert!(!covers(available, dec("1000")));
        assert_eq!(entries_balance(&ledger).unwrap(), dec("60"));
    }

    /// Undo of stock-out restores the quantity
    #[test]
    fn test_undo_stock_out() {
        let mut ledger = vec![entry(EntryKind::StockIn, "L", dec("100"), 1)];
        let out = entry(EntryKind::StockOut, "L", dec("40"), 2);
        ledger.push(out.clone());

        let reversal = undo(&out, 3).unwrap();
        assert_eq!(reversal.kind, EntryKind::StockOutUndo);
        assert_eq!(reversal.reverses_entry_id, Some(out.id));
        ledger.push(reversal.clone());
        assert_eq!(entries_balance(&ledger).unwrap(), dec("100"));

        // Undo entries are not undoable
        assert!(undo(&reversal, 4).is_none());
    }

    /// Fractional quantities keep their scale
    #[test]
    fn test_fractional_quantities() {
        let ledger = vec![
            entry(EntryKind::StockIn, "L", dec("12.750"), 1),
            entry(EntryKind::StockOut, "L", dec("0.250"), 2),
        ];
        assert_eq!(entries_balance(&ledger).unwrap(), dec("12.5"));
    }

    /// Exhausted lots disappear from the available list
    #[test]
    fn test_exhausted_lot_hidden() {
        let ledger = vec![
            entry(EntryKind::StockIn, "A", dec("5"), 1),
            entry(EntryKind::StockIn, "B", dec("5"), 2),
            entry(EntryKind::StockOut, "A", dec("5"), 3),
        ];
        let lots = available_lots(&ledger).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_id, "B");
        assert_eq!(lot_balances(&ledger).unwrap().len(), 2);
    }

    /// Lot number, barcode and QR for a known lot
    #[test]
    fn test_label_codes() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let lot = format_lot_number(date, "00ZZ9A");
        assert_eq!(lot, "LOT-20240131-00ZZ9A");
        assert_eq!(entry_barcode("626000", &lot), "626000-00ZZ9A");
        assert_eq!(entry_qr("p-1", &lot), "STOCK:p-1:LOT-20240131-00ZZ9A");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    fn kind_strategy() -> impl Strategy<Value = EntryKind> {
        prop_oneof![
            Just(EntryKind::StockIn),
            Just(EntryKind::StockOut),
            Just(EntryKind::StockInUndo),
            Just(EntryKind::StockOutUndo),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Balance = Sum(STOCK_IN + STOCK_OUT_UNDO) - Sum(STOCK_OUT + STOCK_IN_UNDO)
        #[test]
        fn prop_fold_matches_sign_rule(
            movements in prop::collection::vec((kind_strategy(), quantity_strategy()), 0..30)
        ) {
            let plus: Decimal = movements
                .iter()
                .filter(|(k, _)| matches!(k, EntryKind::StockIn | EntryKind::StockOutUndo))
                .map(|(_, q)| *q)
                .sum();
            let minus: Decimal = movements
                .iter()
                .filter(|(k, _)| matches!(k, EntryKind::StockOut | EntryKind::StockInUndo))
                .map(|(_, q)| *q)
                .sum();

            prop_assert_eq!(fold_balance(movements.clone()), Ok(plus - minus));
        }

        /// Undo shifts the balance by exactly the reversed quantity
        #[test]
        fn prop_undo_cancels_exactly(
            base in quantity_strategy(),
            q in quantity_strategy(),
            outbound in any::<bool>()
        ) {
            let mut ledger = vec![entry(EntryKind::StockIn, "L", base + q, 0)];
            let kind = if outbound { EntryKind::StockOut } else { EntryKind::StockIn };
            let original = entry(kind, "L", q, 1);
            ledger.push(original.clone());
            let before = entries_balance(&ledger).unwrap();

            ledger.push(undo(&original, 2).unwrap());
            let after = entries_balance(&ledger).unwrap();

            if outbound {
                prop_assert_eq!(after - before, q);
            } else {
                prop_assert_eq!(before - after, q);
            }
        }

        /// Available lots hold stock and come newest first
        #[test]
        fn prop_available_lots_positive_and_ordered(
            rows in prop::collection::vec((0u8..5, kind_strategy(), quantity_strategy()), 1..40)
        ) {
            let ledger: Vec<LedgerEntry> = rows
                .iter()
                .enumerate()
                .map(|(i, (lot, kind, q))| entry(*kind, &format!("LOT-{lot}"), *q, i as i64))
                .collect();

            let lots = available_lots(&ledger).unwrap();
            for lot in &lots {
                prop_assert!(lot.balance > Decimal::ZERO);
            }
            for pair in lots.windows(2) {
                prop_assert!(pair[0].last_updated_at >= pair[1].last_updated_at);
            }
        }

        /// Generated lot numbers always match the documented format
        #[test]
        fn prop_lot_numbers_well_formed(
            days in 0i64..20000,
            indices in prop::collection::vec(any::<usize>(), 6)
        ) {
            let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(days);
            let lot = format_lot_number(date, &lot_suffix_from_indices(indices));
            prop_assert!(is_lot_number(&lot));
        }

        /// Printed labels scan back to their parts
        #[test]
        fn prop_labels_scan_back(
            barcode in "[0-9]{8,13}",
            indices in prop::collection::vec(any::<usize>(), 6)
        ) {
            let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
            let suffix = lot_suffix_from_indices(indices);
            let lot = format_lot_number(date, &suffix);
            let product_id = Uuid::new_v4();

            prop_assert_eq!(
                parse_label(&entry_barcode(&barcode, &lot)),
                Some(LabelCode::Barcode { product_barcode: barcode.clone(), lot_tail: suffix })
            );
            prop_assert_eq!(
                parse_label(&entry_qr(product_id, &lot)),
                Some(LabelCode::Qr { product_id: product_id.to_string(), lot_number: lot })
            );
        }
    }
}
