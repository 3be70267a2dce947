use thiserror::Error;

use crate::domain::{Cents, CustomerId, InvalidTransfer};

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Insufficient funds for customer {customer}: balance {balance} cents, required {required} cents")]
    InsufficientFunds {
        customer: CustomerId,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from customer {0} to itself")]
    SameAccount(CustomerId),

    #[error("Store unavailable: {0:#}")]
    StoreUnavailable(#[from] anyhow::Error),
}

impl BankError {
    /// True for failures caused by the request or the ledger state, false for
    /// infrastructure failures that may succeed on a later attempt.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, BankError::StoreUnavailable(_))
    }
}

impl From<InvalidTransfer> for BankError {
    fn from(err: InvalidTransfer) -> Self {
        match err {
            InvalidTransfer::NonPositiveAmount(_) => BankError::InvalidAmount(err.to_string()),
            InvalidTransfer::SameAccount(customer) => BankError::SameAccount(customer),
        }
    }
}
