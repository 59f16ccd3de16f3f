//! Types used throughout the ATM.

/// Account ID type, representing a unique identifier for a ledger account.
pub type AccountId = u32;

/// Whole-unit withdrawal amount. Notes carry no minor units.
pub type Amount = u32;

/// Face value of a bank note.
pub type Denomination = u32;

/// Number of notes of a single denomination.
pub type NoteCount = u32;
