//! Requests submitted to the ATM and the receipts it hands back.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::atm::types::{AccountId, Amount, Denomination};

/// Enum representing the kind of request.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Withdraw,
    Balance,
    Replenish,
}

/// A single request read from the input.
#[derive(Deserialize, Debug, Clone)]
pub struct Request {
    /// What the caller wants done.
    #[serde(rename = "type")]
    request_type: RequestType,

    /// The account the request is for. Not needed to replenish the till.
    #[serde(rename = "account")]
    account_id: Option<AccountId>,

    /// The amount to withdraw, if applicable.
    amount: Option<Amount>,
}

impl Request {
    /// Gets the type of the request.
    pub fn get_type(&self) -> RequestType {
        self.request_type
    }

    /// Gets the account ID, if any.
    pub fn get_account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    /// Gets the requested amount, if any.
    pub fn get_amount(&self) -> Option<Amount> {
        self.amount
    }

    #[cfg(test)]
    pub fn new(
        request_type: RequestType,
        account_id: Option<AccountId>,
        amount: Option<Amount>,
    ) -> Self {
        Request {
            request_type,
            account_id,
            amount,
        }
    }
}

/// Writes dispensed notes as a single space-separated field.
fn serialize_notes<S>(notes: &[Denomination], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let joined = notes
        .iter()
        .map(Denomination::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    serializer.serialize_str(&joined)
}

/// Outcome of a processed request.
#[derive(Serialize, Debug, Clone)]
pub struct Receipt {
    #[serde(rename = "type")]
    pub request_type: RequestType,

    #[serde(rename = "account")]
    pub account_id: Option<AccountId>,

    pub amount: Option<Amount>,

    /// Notes handed out, empty unless a withdrawal succeeded.
    #[serde(serialize_with = "serialize_notes")]
    pub notes: Vec<Denomination>,

    /// Balance after the request, when the account is known.
    pub balance: Option<Decimal>,

    /// `ok`, or the reason the request failed.
    pub status: String,
}

impl Receipt {
    /// Starts a receipt echoing the request, with no notes and an `ok` status.
    pub fn for_request(request: &Request) -> Self {
        Receipt {
            request_type: request.get_type(),
            account_id: request.get_account_id(),
            amount: request.get_amount(),
            notes: Vec::new(),
            balance: None,
            status: "ok".to_string(),
        }
    }
}
