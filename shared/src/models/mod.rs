//! Domain models for the stock ledger

mod activity;
mod ledger;
mod lot;
mod movement;

pub use activity::*;
pub use ledger::*;
pub use lot::*;
pub use movement::*;
