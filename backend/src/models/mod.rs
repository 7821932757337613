//! Ledger models used by the server
//!
//! Re-exports the domain models from the shared crate

pub use shared::models::*;
