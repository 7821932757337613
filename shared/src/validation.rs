//! Validation utilities for stock movements

use std::borrow::Cow;

use rust_decimal::Decimal;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

/// Longest lot identifier accepted from callers
pub const MAX_LOT_ID_LEN: usize = 64;

/// Largest quantity a single movement may carry (one billion units).
/// Keeps every per-lot sum far inside the `Decimal` range.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest weight a single movement may carry
pub const MAX_WEIGHT: Decimal = MAX_QUANTITY;

/// A movement payload that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct MovementError {
    /// Offending field, in the camelCase used on the wire
    pub field: String,
    pub message: String,
}

impl MovementError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Quantities are strictly positive; the entry kind carries the direction
pub fn validate_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        return Err(violation("positive", "quantity must be greater than zero"));
    }
    if *quantity > MAX_QUANTITY {
        return Err(violation("range", "quantity exceeds the per-movement maximum"));
    }
    Ok(())
}

pub fn validate_weight(weight: &Decimal) -> Result<(), ValidationError> {
    if weight.is_sign_negative() && !weight.is_zero() {
        return Err(violation("non_negative", "weight cannot be negative"));
    }
    if *weight > MAX_WEIGHT {
        return Err(violation("range", "weight exceeds the per-movement maximum"));
    }
    Ok(())
}

pub fn validate_lot_id(lot_id: &str) -> Result<(), ValidationError> {
    if lot_id.trim().is_empty() {
        return Err(violation("required", "lotId cannot be blank"));
    }
    if lot_id.len() > MAX_LOT_ID_LEN {
        return Err(violation("length", "lotId is too long"));
    }
    if lot_id.chars().any(char::is_whitespace) {
        return Err(violation("format", "lotId cannot contain whitespace"));
    }
    Ok(())
}

/// Collapse validator output into the first violation, ordered by field name
pub fn first_violation(errors: &ValidationErrors) -> MovementError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by_key(|(field, _)| **field);

    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                MovementError::new(to_camel_case(field), message)
            })
        })
        .unwrap_or_else(|| MovementError::new("body", "invalid request"))
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
