//! ATM module for dispensing bank notes against account balances.
mod config;
mod dispenser;
mod ledger;
mod request;
mod state;
mod till;
mod types;

pub use config::*;
pub use dispenser::*;
pub use ledger::*;
pub use request::*;
pub use state::*;
pub use till::*;
pub use types::*;
