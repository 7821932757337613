//! Shared ledger domain for the warehouse stock ledger
//!
//! This crate holds everything that must behave identically on the server and
//! in the browser: the entry model and sign rule, balance folding, lot grouping,
//! label code derivation and movement validation. It performs no I/O.

pub mod balance;
pub mod codes;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
