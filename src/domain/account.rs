use serde::{Deserialize, Serialize};

use super::{Cents, format_cents};

/// Unique key identifying an account holder.
pub type CustomerId = i64;

/// A customer account: one balance row per customer.
///
/// Accounts are seeded outside the ledger core; the core only ever moves money
/// between existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub customer_id: CustomerId,
    /// Balance in cents
    pub balance: Cents,
}

impl Account {
    pub fn new(customer_id: CustomerId, balance: Cents) -> Self {
        Self {
            customer_id,
            balance,
        }
    }

    /// Returns true if the account can cover a debit of `amount`.
    pub fn can_cover(&self, amount: Cents) -> bool {
        amount <= self.balance
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "customer {}: {}", self.customer_id, format_cents(self.balance))
    }
}
