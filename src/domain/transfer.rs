use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, CustomerId};

/// A validated request to move `amount` cents from one customer to another.
///
/// Construction checks only what can be known without the store: a positive
/// amount and two distinct customers. Existence and sufficiency are checked
/// inside the transfer scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: CustomerId,
    pub to: CustomerId,
    pub amount: Cents,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTransfer {
    #[error("amount must be positive, got {0} cents")]
    NonPositiveAmount(Cents),

    #[error("cannot transfer from customer {0} to itself")]
    SameAccount(CustomerId),
}

impl TransferRequest {
    pub fn new(from: CustomerId, to: CustomerId, amount: Cents) -> Result<Self, InvalidTransfer> {
        if amount <= 0 {
            return Err(InvalidTransfer::NonPositiveAmount(amount));
        }
        if from == to {
            return Err(InvalidTransfer::SameAccount(from));
        }
        Ok(Self { from, to, amount })
    }
}

/// Outcome of a committed transfer, with both balances as of the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: CustomerId,
    pub to: CustomerId,
    pub amount: Cents,
    pub from_balance: Cents,
    pub to_balance: Cents,
}
