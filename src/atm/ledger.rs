//! Account balances and conditional debits.
use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::atm::AccountId;

/// Accounts present when the ATM starts.
pub const SEED_ACCOUNTS: [(AccountId, Decimal); 3] = [
    (1001, Decimal::from_parts(273859, 0, 0, false, 2)),
    (1002, Decimal::from_parts(2300, 0, 0, false, 2)),
    (1003, Decimal::from_parts(0, 0, 0, false, 2)),
];

/// Balance store the dispenser debits.
pub trait Ledger {
    /// Subtracts `amount` from the account. Returns `Ok(false)` without touching the balance
    /// if the account would be overdrawn.
    fn debit(&mut self, account_id: AccountId, amount: Decimal) -> Result<bool, LedgerError>;

    /// Returns the exact current balance of the account.
    fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError>;
}

/// In-memory ledger keyed by account ID.
#[derive(Debug)]
pub struct AccountLedger {
    balances: HashMap<AccountId, Decimal>,
}

impl AccountLedger {
    /// Creates a ledger holding the given accounts.
    pub fn new(accounts: impl IntoIterator<Item = (AccountId, Decimal)>) -> Self {
        AccountLedger {
            balances: accounts.into_iter().collect(),
        }
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::new(SEED_ACCOUNTS)
    }
}

impl Ledger for AccountLedger {
    fn debit(&mut self, account_id: AccountId, amount: Decimal) -> Result<bool, LedgerError> {
        if amount < Decimal::ZERO {
            warn!(%amount, "Debit amount is negative");
            return Err(LedgerError::NegativeAmount);
        }

        let balance = self
            .balances
            .get_mut(&account_id)
            .ok_or(LedgerError::UnknownAccount(account_id))?;

        let updated = *balance - amount;
        if updated < Decimal::ZERO {
            info!(
                account_id,
                %amount,
                balance = %balance,
                "Inadequate funds for debit"
            );
            return Ok(false);
        }

        *balance = updated;
        info!(account_id, %amount, balance = %updated, "Debited account");
        Ok(true)
    }

    fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.balances
            .get(&account_id)
            .copied()
            .ok_or(LedgerError::UnknownAccount(account_id))
    }
}

/// Errors raised for ledger calls with bad arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("The amount cannot be negative number.")]
    NegativeAmount,
    #[error("Could not find the account with ID={0}")]
    UnknownAccount(AccountId),
}
