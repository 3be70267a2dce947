//! Account storage: the scoped-transaction capability the ledger core relies
//! on, plus the SQLite and in-memory backends that provide it.

mod memory;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Account, Cents, CustomerId};

pub use memory::*;
pub use sqlite::*;

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

/// A store of customer balances that can open all-or-nothing scopes.
#[async_trait]
pub trait AccountStore: Send + Sync {
    type Scope: LedgerScope;

    /// Open a scoped transaction. Writes made through the scope become visible
    /// only after [`LedgerScope::commit`].
    async fn begin(&self) -> Result<Self::Scope>;

    /// Read a balance outside of any scope.
    async fn balance(&self, customer: CustomerId) -> Result<Option<Cents>>;

    /// List all accounts ordered by customer id.
    async fn accounts(&self) -> Result<Vec<Account>>;
}

/// A unit of work against an [`AccountStore`].
///
/// Dropping a scope without committing it discards every write made through it.
#[async_trait]
pub trait LedgerScope: Send {
    /// Read a balance as seen inside this scope.
    async fn balance(&mut self, customer: CustomerId) -> Result<Option<Cents>>;

    /// Add `delta` (negative for a debit) to a customer's balance.
    /// Returns `false` when no account matched.
    async fn adjust_balance(&mut self, customer: CustomerId, delta: Cents) -> Result<bool>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}
