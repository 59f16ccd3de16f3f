//! Note selection and withdrawal processing.
//!
//! A withdrawal is validated against the configured bounds, a note combination is searched
//! for on a copy of the till, the ledger is debited, and only then is the copy committed
//! as the live till. A rejected or failed debit leaves the till exactly as it was.
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::atm::{AccountId, Amount, AtmConfig, Denomination, Ledger, LedgerError, Till};

/// Notes chosen for a withdrawal together with the till they would leave behind.
struct Allocation {
    notes: Vec<Denomination>,
    till: Till,
}

/// Dispenses notes from a till and debits the matching account.
pub struct Dispenser<L> {
    config: AtmConfig,
    till: Till,
    ledger: L,
}

impl<L: Ledger> Dispenser<L> {
    /// Creates a dispenser with an empty till. Call [`Dispenser::replenish`] to load notes.
    pub fn new(config: AtmConfig, ledger: L) -> Self {
        Dispenser {
            config,
            till: Till::default(),
            ledger,
        }
    }

    /// Current balance of the account.
    pub fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.ledger.balance(account_id)
    }

    /// Read-only view of the till.
    pub fn till(&self) -> &Till {
        &self.till
    }

    /// Resets the till to the configured baseline.
    pub fn replenish(&mut self) {
        self.till.replenish(&self.config.baseline);
        info!(notes = ?self.till.counts(), "Till replenished");
    }

    /// Withdraws `amount` from the account and returns the notes to dispense.
    pub fn withdraw(
        &mut self,
        account_id: AccountId,
        amount: Amount,
    ) -> Result<Vec<Denomination>, DispenseError> {
        self.check_amount_bounds(amount)?;

        let Some(allocation) = self.allocate(amount) else {
            error!(
                amount,
                "Could not dispense amount, insufficient bank notes at present"
            );
            return Err(DispenseError::TillDepleted);
        };

        if !self.ledger.debit(account_id, Decimal::from(amount))? {
            return Err(DispenseError::InsufficientFunds { account_id, amount });
        }

        self.till = allocation.till;
        info!(account_id, amount, notes = ?allocation.notes, "Dispensing amount");
        Ok(allocation.notes)
    }

    fn check_amount_bounds(&self, amount: Amount) -> Result<(), DispenseError> {
        let err = if amount == 0 || amount < self.config.min_amount {
            DispenseError::BelowMinimum(self.config.min_amount.max(1))
        } else if amount > self.config.max_amount {
            DispenseError::AboveMaximum(self.config.max_amount)
        } else if amount.checked_rem(self.config.step) != Some(0) {
            DispenseError::NotDivisible(self.config.step)
        } else {
            return Ok(());
        };
        warn!(amount, "{err}");
        Err(err)
    }

    /// Tries a combination containing the preferred note first, then plain greedy.
    fn allocate(&self, amount: Amount) -> Option<Allocation> {
        if let Some(note) = self.config.preferred_note {
            if let Some(allocation) = self.allocate_with(note, amount) {
                return Some(allocation);
            }
            warn!(amount, note, "Could not dispense amount with preferred note in it");
        }
        greedy_descending(amount, self.till.clone(), Vec::new())
    }

    fn allocate_with(&self, note: Denomination, amount: Amount) -> Option<Allocation> {
        let remaining = amount.checked_sub(note)?;
        let mut till = self.till.clone();
        if !till.take(note) {
            return None;
        }
        greedy_descending(remaining, till, vec![note])
    }
}

/// Repeatedly takes the largest note that still fits. Succeeds only if the amount is
/// covered exactly; no backtracking past the first dead end.
fn greedy_descending(
    mut remaining: Amount,
    mut till: Till,
    mut notes: Vec<Denomination>,
) -> Option<Allocation> {
    while let Some(note) = till.largest_fitting(remaining) {
        till.take(note);
        notes.push(note);
        remaining -= note;
    }
    (remaining == 0).then_some(Allocation { notes, till })
}

/// Errors that can occur while processing a withdrawal.
#[derive(Error, Debug)]
pub enum DispenseError {
    #[error("Cannot dispense amounts less than {0}")]
    BelowMinimum(Amount),
    #[error("Cannot withdraw more than {0}")]
    AboveMaximum(Amount),
    #[error("Cannot dispense amounts that are not divisible by a factor of {0}")]
    NotDivisible(Amount),
    #[error("Not enough bank notes")]
    TillDepleted,
    #[error("Insufficient funds in account {account_id} to withdraw {amount}")]
    InsufficientFunds { account_id: AccountId, amount: Amount },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl DispenseError {
    /// True for requests that could never succeed as made, regardless of till or funds.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            DispenseError::BelowMinimum(_)
                | DispenseError::AboveMaximum(_)
                | DispenseError::NotDivisible(_)
                | DispenseError::Ledger(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::atm::{
        AccountId, AccountLedger, AtmConfig, DispenseError, Dispenser, Ledger, LedgerError,
    };

    /// Ledger double that records debits and answers with a fixed outcome.
    struct StubLedger {
        outcome: Result<bool, LedgerError>,
        debits: Vec<(AccountId, Decimal)>,
        balance_calls: std::cell::Cell<usize>,
    }

    impl StubLedger {
        fn answering(outcome: Result<bool, LedgerError>) -> Self {
            StubLedger {
                outcome,
                debits: Vec::new(),
                balance_calls: std::cell::Cell::new(0),
            }
        }
    }

    impl Ledger for StubLedger {
        fn debit(&mut self, account_id: AccountId, amount: Decimal) -> Result<bool, LedgerError> {
            self.debits.push((account_id, amount));
            self.outcome.clone()
        }

        fn balance(&self, _account_id: AccountId) -> Result<Decimal, LedgerError> {
            self.balance_calls.set(self.balance_calls.get() + 1);
            Ok(Decimal::ZERO)
        }
    }

    fn dispenser() -> Dispenser<StubLedger> {
        let mut dispenser = Dispenser::new(AtmConfig::default(), StubLedger::answering(Ok(true)));
        dispenser.replenish();
        dispenser
    }

    fn sorted(mut notes: Vec<u32>) -> Vec<u32> {
        notes.sort_unstable();
        notes
    }

    #[test]
    fn test_balance_delegates_to_ledger() {
        let dispenser = dispenser();
        assert_eq!(dispenser.balance(1001).unwrap(), Decimal::ZERO);
        assert_eq!(dispenser.ledger.balance_calls.get(), 1);
    }

    #[test]
    fn test_less_than_minimum() {
        let mut dispenser = dispenser();
        let err = dispenser.withdraw(1001, 1).unwrap_err();
        assert!(matches!(err, DispenseError::BelowMinimum(20)));
        assert_eq!(err.to_string(), "Cannot dispense amounts less than 20");
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_more_than_maximum() {
        let mut dispenser = dispenser();
        let err = dispenser.withdraw(1001, 251).unwrap_err();
        assert!(matches!(err, DispenseError::AboveMaximum(250)));
        assert_eq!(err.to_string(), "Cannot withdraw more than 250");
    }

    #[test]
    fn test_not_divisible() {
        let mut dispenser = dispenser();
        dispenser.till.set(5, 1);
        let err = dispenser.withdraw(1001, 23).unwrap_err();
        assert!(matches!(err, DispenseError::NotDivisible(5)));
        assert_eq!(
            err.to_string(),
            "Cannot dispense amounts that are not divisible by a factor of 5"
        );
    }

    #[test]
    fn test_rejected_amounts_touch_nothing() {
        let mut dispenser = dispenser();
        let before = dispenser.till().clone();
        for amount in [0, 5, 15, 19, 21, 42, 249, 251, 255, 1000] {
            let err = dispenser.withdraw(1001, amount).unwrap_err();
            assert!(err.is_invalid_request(), "{amount} should be rejected");
        }
        assert_eq!(dispenser.till(), &before);
        assert!(dispenser.ledger.debits.is_empty());
    }

    #[test]
    fn test_notes_for_100_without_enough_fives() {
        let mut dispenser = dispenser();
        dispenser.till.set(5, 1);
        dispenser.till.set(50, 2);
        let notes = dispenser.withdraw(1001, 100).unwrap();
        assert_eq!(sorted(notes), vec![50, 50]);
        assert_eq!(dispenser.ledger.debits, vec![(1001, Decimal::from(100))]);
    }

    #[test]
    fn test_notes_for_50() {
        let mut dispenser = dispenser();
        let notes = dispenser.withdraw(1001, 50).unwrap();
        assert_eq!(sorted(notes), vec![5, 5, 20, 20]);
    }

    #[test]
    fn test_notes_for_25() {
        let mut dispenser = dispenser();
        let notes = dispenser.withdraw(1001, 25).unwrap();
        assert_eq!(sorted(notes), vec![5, 20]);
    }

    #[test]
    fn test_zero_amount_rejected_even_without_minimum() {
        let config = AtmConfig {
            min_amount: 0,
            ..Default::default()
        };
        let mut dispenser = Dispenser::new(config, StubLedger::answering(Ok(true)));
        dispenser.replenish();
        assert!(matches!(
            dispenser.withdraw(1001, 0),
            Err(DispenseError::BelowMinimum(1))
        ));
        assert!(dispenser.ledger.debits.is_empty());
    }

    #[test]
    fn test_notes_for_30_without_fives() {
        let mut dispenser = dispenser();
        dispenser.till.set(5, 0);
        let notes = dispenser.withdraw(1001, 30).unwrap();
        assert_eq!(sorted(notes), vec![10, 20]);
        assert_eq!(dispenser.till().available(5), 0);
        assert_eq!(dispenser.till().available(10), 19);
        assert_eq!(dispenser.till().available(20), 19);
    }

    #[test]
    fn test_notes_for_30_with_single_five() {
        let mut dispenser = dispenser();
        dispenser.till.set(5, 1);
        let notes = dispenser.withdraw(1001, 30).unwrap();
        assert_eq!(sorted(notes), vec![10, 20]);
        assert_eq!(dispenser.till().available(5), 1);
    }

    #[test]
    fn test_only_fifties_left() {
        let mut dispenser = dispenser();
        dispenser.till.set(20, 0);
        dispenser.till.set(10, 0);
        dispenser.till.set(5, 0);
        let err = dispenser.withdraw(1001, 20).unwrap_err();
        assert!(matches!(err, DispenseError::TillDepleted));
        assert_eq!(err.to_string(), "Not enough bank notes");
        assert!(!err.is_invalid_request());
        assert!(dispenser.ledger.debits.is_empty());
    }

    #[test]
    fn test_greedy_misses_exact_combination() {
        let mut dispenser = dispenser();
        dispenser.till.set(5, 1);
        dispenser.till.set(10, 0);
        dispenser.till.set(20, 3);
        dispenser.till.set(50, 2);
        assert!(matches!(
            dispenser.withdraw(1001, 60),
            Err(DispenseError::TillDepleted)
        ));
    }

    #[test]
    fn test_empty_till_before_replenish() {
        let mut dispenser =
            Dispenser::new(AtmConfig::default(), StubLedger::answering(Ok(true)));
        assert!(matches!(
            dispenser.withdraw(1001, 50),
            Err(DispenseError::TillDepleted)
        ));
    }

    #[test]
    fn test_without_preferred_note() {
        let config = AtmConfig {
            preferred_note: None,
            ..Default::default()
        };
        let mut dispenser = Dispenser::new(config, StubLedger::answering(Ok(true)));
        dispenser.replenish();
        assert_eq!(sorted(dispenser.withdraw(1001, 50).unwrap()), vec![50]);
    }

    #[test]
    fn test_ledger_error_propagates_and_keeps_till() {
        let mut dispenser = Dispenser::new(
            AtmConfig::default(),
            StubLedger::answering(Err(LedgerError::UnknownAccount(1001))),
        );
        dispenser.replenish();
        let before = dispenser.till().clone();
        let err = dispenser.withdraw(1001, 30).unwrap_err();
        assert_eq!(err.to_string(), "Could not find the account with ID=1001");
        assert!(err.is_invalid_request());
        assert_eq!(dispenser.till(), &before);
    }

    #[test]
    fn test_insufficient_funds_keeps_till() {
        let mut dispenser = Dispenser::new(AtmConfig::default(), StubLedger::answering(Ok(false)));
        dispenser.replenish();
        let before = dispenser.till().clone();
        assert!(matches!(
            dispenser.withdraw(1001, 30),
            Err(DispenseError::InsufficientFunds {
                account_id: 1001,
                amount: 30
            })
        ));
        assert_eq!(dispenser.till(), &before);
    }

    #[test]
    fn test_every_valid_amount_sums_and_deducts() {
        let config = AtmConfig::default();
        for amount in (config.min_amount..=config.max_amount).step_by(config.step as usize) {
            let mut dispenser = dispenser();
            let before = dispenser.till().clone();
            let notes = dispenser.withdraw(1001, amount).unwrap();
            assert_eq!(notes.iter().sum::<u32>(), amount);
            for (&note, &count) in before.counts() {
                let used = notes.iter().filter(|&&n| n == note).count() as u32;
                assert_eq!(dispenser.till().available(note), count - used);
            }
        }
    }

    #[test]
    fn test_draining_the_till() {
        let mut dispenser = dispenser();
        let value = |d: &Dispenser<StubLedger>| -> u32 {
            d.till().counts().iter().map(|(note, count)| note * count).sum()
        };
        let loaded = value(&dispenser);
        let mut dispensed = 0;
        let err = loop {
            match dispenser.withdraw(1001, 250) {
                Ok(notes) => dispensed += notes.iter().sum::<u32>(),
                Err(err) => break err,
            }
        };
        assert!(matches!(err, DispenseError::TillDepleted));
        assert_eq!(dispensed + value(&dispenser), loaded);

        dispenser.replenish();
        assert_eq!(value(&dispenser), loaded);
    }

    #[test]
    fn test_withdraw_against_account_ledger() {
        let mut dispenser = Dispenser::new(AtmConfig::default(), AccountLedger::default());
        dispenser.replenish();
        dispenser.withdraw(1001, 100).unwrap();
        assert_eq!(dispenser.balance(1001).unwrap().to_string(), "2638.59");

        assert!(matches!(
            dispenser.withdraw(1002, 50),
            Err(DispenseError::InsufficientFunds { .. })
        ));
        assert_eq!(dispenser.balance(1002).unwrap().to_string(), "23.00");
    }
}
