//! Business logic services for the stock ledger

pub mod ledger;
pub mod store;

#[cfg(test)]
mod ledger_props;

pub use ledger::LedgerService;
pub use store::PgLedgerStore;
