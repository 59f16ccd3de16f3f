//! The `State` module owns the dispenser and serves requests one at a time.
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::atm::{AccountLedger, AtmConfig, Dispenser, Receipt, Request, RequestType};

/// Single owner of the till and the ledger. Every request arrives over the channel, so
/// withdrawals never interleave.
pub struct State {
    /// The dispenser, holding the till and the account ledger.
    dispenser: Dispenser<AccountLedger>,
    /// A channel receiver for incoming requests.
    receiver: mpsc::Receiver<Request>,
    /// Receipts for every request processed so far.
    receipts: Vec<Receipt>,
}

impl State {
    /// Creates a new `State` with a freshly replenished till.
    pub fn new(
        config: AtmConfig,
        ledger: AccountLedger,
        receiver: mpsc::Receiver<Request>,
    ) -> Self {
        let mut dispenser = Dispenser::new(config, ledger);
        dispenser.replenish();
        State {
            dispenser,
            receiver,
            receipts: Vec::new(),
        }
    }

    /// Retrieves the receipts produced so far.
    pub fn get_receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Retrieves the dispenser.
    pub fn get_dispenser(&self) -> &Dispenser<AccountLedger> {
        &self.dispenser
    }

    /// Processes a request and returns its receipt.
    fn process_request(&mut self, request: &Request) -> Receipt {
        let mut receipt = Receipt::for_request(request);

        let outcome = match (request.get_type(), request.get_account_id()) {
            (RequestType::Replenish, _) => {
                self.dispenser.replenish();
                Ok(())
            }
            (_, None) => Err("Missing account".to_string()),
            (RequestType::Balance, Some(_)) => Ok(()),
            (RequestType::Withdraw, Some(account_id)) => match request.get_amount() {
                None => Err("Missing amount".to_string()),
                Some(amount) => self
                    .dispenser
                    .withdraw(account_id, amount)
                    .map(|notes| receipt.notes = notes)
                    .map_err(|e| {
                        if !e.is_invalid_request() {
                            error!(account_id, amount, error = %e, "Withdrawal could not be served");
                        }
                        e.to_string()
                    }),
            },
        };

        if let Some(account_id) = request.get_account_id() {
            match self.dispenser.balance(account_id) {
                Ok(balance) => receipt.balance = Some(balance),
                Err(e) if outcome.is_ok() => receipt.status = e.to_string(),
                Err(_) => {}
            }
        }
        if let Err(reason) = outcome {
            warn!(?request, %reason, "Request failed");
            receipt.status = reason;
        }
        receipt
    }

    /// Runs the request loop until every sender is dropped.
    pub async fn run(&mut self) {
        while let Some(request) = self.receiver.recv().await {
            let receipt = self.process_request(&request);
            self.receipts.push(receipt);
        }
    }
}
