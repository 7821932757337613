//! WebAssembly module for the Warehouse Stock Ledger
//!
//! Lets label and stock screens compute exactly what the server computes:
//! - Entry barcodes and QR payloads
//! - Lot number checks and previews
//! - Scanned label parsing
//! - Balance and available-lot previews from ledger entries
//! - Movement validation before submit

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::balance;
use shared::codes::{self, LabelCode};

fn js_error(context: &str, e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, e))
}

/// A signed movement as entered on screen, before it reaches the server
#[derive(Debug, Deserialize)]
struct MovementPreview {
    kind: EntryKind,
    quantity: Decimal,
}

/// Barcode printed on a stock-in label
#[wasm_bindgen]
pub fn entry_barcode(product_barcode: &str, lot_number: &str) -> String {
    codes::entry_barcode(product_barcode, lot_number)
}

/// QR payload printed on a stock-in label
#[wasm_bindgen]
pub fn entry_qr(product_id: &str, lot_number: &str) -> String {
    codes::entry_qr(product_id, lot_number)
}

#[wasm_bindgen]
pub fn is_lot_number(value: &str) -> bool {
    codes::is_lot_number(value)
}

/// Lot number for a `YYYY-MM-DD` date and a 6-character suffix
#[wasm_bindgen]
pub fn format_lot_number(date: &str, suffix: &str) -> Result<String, JsValue> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| js_error("Invalid date", e))?;
    let lot = codes::format_lot_number(date, &suffix.to_uppercase());
    if !codes::is_lot_number(&lot) {
        return Err(JsValue::from_str("Suffix must be 6 base36 characters"));
    }
    Ok(lot)
}

/// Today's (UTC) lot number with the given suffix, as the server would assign it
#[wasm_bindgen]
pub fn preview_lot_number(suffix: &str) -> Result<String, JsValue> {
    let now = js_sys::Date::new_0();
    let date = format!(
        "{:04}-{:02}-{:02}",
        now.get_utc_full_year(),
        now.get_utc_month() + 1,
        now.get_utc_date()
    );
    format_lot_number(&date, suffix)
}

/// Parse a scanned label into JSON: `{type: "QR", productId, lotNumber}`
/// or `{type: "BARCODE", productBarcode, lotTail}`
#[wasm_bindgen]
pub fn parse_label(code: &str) -> Result<String, JsValue> {
    let label = codes::parse_label(code).ok_or_else(|| JsValue::from_str("Unrecognised label code"))?;
    let value = match label {
        LabelCode::Qr {
            product_id,
            lot_number,
        } => json!({ "type": "QR", "productId": product_id, "lotNumber": lot_number }),
        LabelCode::Barcode {
            product_barcode,
            lot_tail,
        } => json!({ "type": "BARCODE", "productBarcode": product_barcode, "lotTail": lot_tail }),
    };
    Ok(value.to_string())
}

/// Balance of `[{kind, quantity}]` movements, as a decimal string
#[wasm_bindgen]
pub fn preview_balance(movements_json: &str) -> Result<String, JsValue> {
    let movements: Vec<MovementPreview> =
        serde_json::from_str(movements_json).map_err(|e| js_error("Invalid movements JSON", e))?;
    let total = balance::fold_balance(movements.into_iter().map(|m| (m.kind, m.quantity)))
        .map_err(|e| js_error("Invalid movements", e))?;
    Ok(total.to_string())
}

/// Lots still holding stock, newest first, from full ledger entries JSON
#[wasm_bindgen]
pub fn preview_available_lots(entries_json: &str) -> Result<String, JsValue> {
    let entries: Vec<LedgerEntry> =
        serde_json::from_str(entries_json).map_err(|e| js_error("Invalid entries JSON", e))?;
    let lots = balance::available_lots(&entries).map_err(|e| js_error("Invalid entries", e))?;
    serde_json::to_string(&lots).map_err(|e| js_error("Serialization failed", e))
}

/// Whether `quantity` may be withdrawn from `available`
#[wasm_bindgen]
pub fn can_withdraw(available: &str, quantity: &str) -> bool {
    match (available.parse::<Decimal>(), quantity.parse::<Decimal>()) {
        (Ok(available), Ok(quantity)) => quantity > Decimal::ZERO && balance::covers(available, quantity),
        _ => false,
    }
}

/// Validate a tagged movement payload; errors carry `field: message`
#[wasm_bindgen]
pub fn validate_movement(movement_json: &str) -> Result<(), JsValue> {
    let movement: StockMovement =
        serde_json::from_str(movement_json).map_err(|e| js_error("Invalid movement JSON", e))?;
    movement.check().map_err(|e| JsValue::from_str(&e.to_string()))
}
