//! Browser-side tests for the bindings that need a JS host
//!
//! Run with `wasm-pack test --headless --firefox wasm`.

#![cfg(target_arch = "wasm32")]

use stock_ledger_wasm::{is_lot_number, preview_available_lots, preview_balance, preview_lot_number};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn preview_lot_number_uses_today() {
    let lot = preview_lot_number("a1b2c3").unwrap();
    assert!(is_lot_number(&lot));
    assert!(lot.ends_with("-A1B2C3"));
}

#[wasm_bindgen_test]
fn preview_lot_number_rejects_short_suffix() {
    assert!(preview_lot_number("ab").is_err());
}

#[wasm_bindgen_test]
fn overflowing_balance_is_an_error() {
    let max = rust_decimal::Decimal::MAX.to_string();
    let json = format!(
        r#"[{{"kind": "STOCK_IN", "quantity": "{max}"}}, {{"kind": "STOCK_IN", "quantity": "{max}"}}]"#
    );
    assert!(preview_balance(&json).is_err());
}

#[wasm_bindgen_test]
fn malformed_entries_are_an_error() {
    assert!(preview_available_lots("not json").is_err());
}
