//! Lot numbers and label codes
//!
//! These strings are printed on labels and scanned back later, so every
//! function here is pure and must stay byte-for-byte stable.

use std::fmt::Display;

use chrono::NaiveDate;

pub const LOT_PREFIX: &str = "LOT";
pub const LOT_SUFFIX_LEN: usize = 6;
pub const BASE36_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const QR_PREFIX: &str = "STOCK";

/// `LOT-<YYYYMMDD>-<suffix>`
pub fn format_lot_number(date: NaiveDate, suffix: &str) -> String {
    format!("{}-{}-{}", LOT_PREFIX, date.format("%Y%m%d"), suffix)
}

/// Build a lot suffix from arbitrary indices, each reduced into the base36 alphabet
pub fn lot_suffix_from_indices<I>(indices: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    indices
        .into_iter()
        .take(LOT_SUFFIX_LEN)
        .map(|i| BASE36_ALPHABET[i % BASE36_ALPHABET.len()] as char)
        .collect()
}

/// Whether `s` has the generated lot number shape
pub fn is_lot_number(s: &str) -> bool {
    let mut parts = s.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    prefix == LOT_PREFIX
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && date.len() == 8
        && suffix.len() == LOT_SUFFIX_LEN
        && suffix.bytes().all(|b| BASE36_ALPHABET.contains(&b))
}

/// Segment of the lot number after its last '-', or the whole number
pub fn lot_tail(lot_number: &str) -> &str {
    lot_number
        .rsplit_once('-')
        .map_or(lot_number, |(_, tail)| tail)
}

/// `<productBarcode>-<lot tail>`
pub fn entry_barcode(product_barcode: &str, lot_number: &str) -> String {
    format!("{}-{}", product_barcode, lot_tail(lot_number))
}

/// `STOCK:<productId>:<lotNumber>`
pub fn entry_qr(product_id: impl Display, lot_number: &str) -> String {
    format!("{}:{}:{}", QR_PREFIX, product_id, lot_number)
}

/// A scanned label, split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelCode {
    /// From an entry QR payload
    Qr { product_id: String, lot_number: String },
    /// From an entry barcode; only the lot tail survives on the label
    Barcode { product_barcode: String, lot_tail: String },
}

/// Parse a scanned QR payload or entry barcode
pub fn parse_label(code: &str) -> Option<LabelCode> {
    let code = code.trim();

    if let Some(rest) = code.strip_prefix(QR_PREFIX).and_then(|r| r.strip_prefix(':')) {
        let (product_id, lot_number) = rest.split_once(':')?;
        if product_id.is_empty() || lot_number.is_empty() {
            return None;
        }
        return Some(LabelCode::Qr {
            product_id: product_id.to_string(),
            lot_number: lot_number.to_string(),
        });
    }

    let (product_barcode, tail) = code.rsplit_once('-')?;
    if product_barcode.is_empty() || tail.is_empty() {
        return None;
    }
    Some(LabelCode::Barcode {
        product_barcode: product_barcode.to_string(),
        lot_tail: tail.to_string(),
    })
}
