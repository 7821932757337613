//! Stock movement requests
//!
//! Every write to the ledger starts as one of these payloads. They are checked
//! once, at the boundary, before any store access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{EntrySource, LedgerEntry, StockInReceipt};
use crate::validation::{first_violation, validate_lot_id, validate_quantity, validate_weight, MovementError};

/// Goods received into a warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockInRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(custom = "validate_quantity")]
    pub quantity: Decimal,
    #[validate(custom = "validate_weight")]
    pub weight: Option<Decimal>,
    pub scale_id: Option<Uuid>,
    /// Existing lot to add to; a new lot number is generated when absent
    #[validate(custom = "validate_lot_id")]
    pub lot_id: Option<String>,
    pub source: Option<EntrySource>,
}

impl StockInRequest {
    /// Source recorded on the entry: explicit, else `SCALE` when a scale is attached
    pub fn resolved_source(&self) -> EntrySource {
        self.source.unwrap_or(if self.scale_id.is_some() {
            EntrySource::Scale
        } else {
            EntrySource::Manual
        })
    }

    pub fn check(&self) -> Result<(), MovementError> {
        self.validate().map_err(|e| first_violation(&e))?;
        if self.resolved_source() == EntrySource::Scale && self.scale_id.is_none() {
            return Err(MovementError::new(
                "scaleId",
                "a scale reading requires scaleId",
            ));
        }
        Ok(())
    }
}

/// Goods leaving a warehouse from a specific lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockOutRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(custom = "validate_lot_id")]
    pub lot_id: String,
    #[validate(custom = "validate_quantity")]
    pub quantity: Decimal,
    #[validate(custom = "validate_weight")]
    pub weight: Option<Decimal>,
}

impl StockOutRequest {
    pub fn check(&self) -> Result<(), MovementError> {
        self.validate().map_err(|e| first_violation(&e))
    }
}

/// Reversal of a previously recorded entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRequest {
    pub entry_id: Uuid,
}

/// Any write against the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovement {
    StockIn(StockInRequest),
    StockOut(StockOutRequest),
    Undo(UndoRequest),
}

impl StockMovement {
    pub fn check(&self) -> Result<(), MovementError> {
        match self {
            StockMovement::StockIn(req) => req.check(),
            StockMovement::StockOut(req) => req.check(),
            StockMovement::Undo(_) => Ok(()),
        }
    }
}

/// Result of applying a [`StockMovement`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementOutcome {
    StockIn(StockInReceipt),
    StockOut(LedgerEntry),
    Undo(LedgerEntry),
}

impl MovementOutcome {
    /// The entry appended by the movement
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            MovementOutcome::StockIn(receipt) => &receipt.entry,
            MovementOutcome::StockOut(entry) | MovementOutcome::Undo(entry) => entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_in(quantity: i64) -> StockInRequest {
        StockInRequest {
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            quantity: Decimal::from(quantity),
            weight: None,
            scale_id: None,
            lot_id: None,
            source: None,
        }
    }

    #[test]
    fn accepts_positive_quantity() {
        assert!(stock_in(5).check().is_ok());
    }

    #[test]
    fn rejects_zero_and_negative_quantity() {
        let err = stock_in(0).check().unwrap_err();
        assert_eq!(err.field, "quantity");
        assert!(stock_in(-3).check().is_err());
    }

    #[test]
    fn rejects_negative_weight() {
        let mut req = stock_in(5);
        req.weight = Some(Decimal::from(-1));
        assert_eq!(req.check().unwrap_err().field, "weight");
        req.weight = Some(Decimal::ZERO);
        assert!(req.check().is_ok());
    }

    #[test]
    fn scale_source_needs_scale() {
        let mut req = stock_in(5);
        req.source = Some(EntrySource::Scale);
        assert_eq!(req.check().unwrap_err().field, "scaleId");

        req.scale_id = Some(Uuid::new_v4());
        assert!(req.check().is_ok());
    }

    #[test]
    fn source_defaults_from_scale() {
        let mut req = stock_in(5);
        assert_eq!(req.resolved_source(), EntrySource::Manual);
        req.scale_id = Some(Uuid::new_v4());
        assert_eq!(req.resolved_source(), EntrySource::Scale);
        req.source = Some(EntrySource::Manual);
        assert_eq!(req.resolved_source(), EntrySource::Manual);
    }

    #[test]
    fn stock_out_requires_non_blank_lot() {
        let req = StockOutRequest {
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_id: "   ".to_string(),
            quantity: Decimal::ONE,
            weight: None,
        };
        assert_eq!(req.check().unwrap_err().field, "lotId");
    }

    #[test]
    fn movement_is_tagged_by_type() {
        let json = serde_json::json!({
            "type": "STOCK_OUT",
            "productId": Uuid::nil(),
            "warehouseId": Uuid::nil(),
            "lotId": "LOT-20240101-ABC123",
            "quantity": "2.5"
        });
        let movement: StockMovement = serde_json::from_value(json).unwrap();
        match movement {
            StockMovement::StockOut(req) => {
                assert_eq!(req.lot_id, "LOT-20240101-ABC123");
                assert_eq!(req.quantity, Decimal::new(25, 1));
            }
            other => panic!("unexpected movement {other:?}"),
        }
    }

    #[test]
    fn undo_movement_parses() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({ "type": "UNDO", "entryId": id });
        let movement: StockMovement = serde_json::from_value(json).unwrap();
        assert_eq!(movement, StockMovement::Undo(UndoRequest { entry_id: id }));
        assert!(movement.check().is_ok());
    }
}
