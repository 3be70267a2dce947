use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::config::BankConfig;
use crate::domain::{
    Account, Cents, CustomerId, TransferReceipt, TransferRequest, format_cents,
};
use crate::storage::{AccountStore, LedgerScope, SqliteStore};

use super::BankError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (API, batch job, etc.).
pub struct Bank<S> {
    store: S,
    transfer_timeout: Duration,
}

impl Bank<SqliteStore> {
    /// Initialize a new database as described by `config`.
    pub async fn init(config: &BankConfig) -> Result<Self, BankError> {
        let store = SqliteStore::init(config).await?;
        Ok(Self::new(store).with_transfer_timeout(config.transfer_timeout()))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &BankConfig) -> Result<Self, BankError> {
        let store = SqliteStore::connect(config).await?;
        Ok(Self::new(store).with_transfer_timeout(config.transfer_timeout()))
    }
}

impl<S: AccountStore> Bank<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            transfer_timeout: BankConfig::default().transfer_timeout(),
        }
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the current balance of a customer.
    pub async fn balance_for_customer(&self, customer: CustomerId) -> Result<Cents, BankError> {
        self.store
            .balance(customer)
            .await?
            .ok_or(BankError::CustomerNotFound(customer))
    }

    /// Move `amount` cents from one customer to another.
    ///
    /// The debit and the credit are applied in a single scope: either both are
    /// committed or the ledger is left exactly as it was. Nothing is retried.
    pub async fn transfer(
        &self,
        from: CustomerId,
        to: CustomerId,
        amount: Cents,
    ) -> Result<TransferReceipt, BankError> {
        let request = TransferRequest::new(from, to, amount).inspect_err(|err| {
            warn!(from, to, amount, error = %err, "transfer rejected");
        })?;

        debug!(from, to, amount, "transfer started");
        // Only begin and apply are bounded. COMMIT always runs to completion.
        let staged = tokio::time::timeout(self.transfer_timeout, self.stage(request)).await;
        let (scope, receipt) = match staged {
            Ok(result) => result?,
            Err(_) => {
                // The scope was dropped with the timed-out future, which rolls it back.
                warn!(from, to, amount, "transfer timed out, rolled back");
                return Err(BankError::StoreUnavailable(anyhow!(
                    "transfer timed out after {:?}",
                    self.transfer_timeout
                )));
            }
        };

        scope.commit().await?;
        info!(
            from = %Account::new(receipt.from, receipt.from_balance),
            to = %Account::new(receipt.to, receipt.to_balance),
            amount = %format_cents(receipt.amount),
            "transfer committed"
        );
        Ok(receipt)
    }

    /// List all accounts ordered by customer id.
    pub async fn accounts(&self) -> Result<Vec<Account>, BankError> {
        Ok(self.store.accounts().await?)
    }

    /// Sum of every balance in the ledger. Transfers never change it.
    pub async fn total_holdings(&self) -> Result<Cents, BankError> {
        self.store
            .accounts()
            .await?
            .iter()
            .try_fold(0 as Cents, |total, account| total.checked_add(account.balance))
            .ok_or_else(|| BankError::StoreUnavailable(anyhow!("total holdings overflow")))
    }

    /// Open a scope and apply the transfer to it, leaving the commit to the caller.
    /// On failure the scope is rolled back before returning.
    async fn stage(
        &self,
        request: TransferRequest,
    ) -> Result<(S::Scope, TransferReceipt), BankError> {
        let mut scope = self.store.begin().await?;

        match Self::apply(&mut scope, &request).await {
            Ok(receipt) => Ok((scope, receipt)),
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    warn!(error = %rollback_err, "explicit rollback failed, scope discarded");
                }
                warn!(
                    from = request.from,
                    to = request.to,
                    amount = request.amount,
                    error = %err,
                    "transfer rolled back"
                );
                Err(err)
            }
        }
    }

    async fn apply(
        scope: &mut S::Scope,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, BankError> {
        debug!(from = request.from, "validating transfer");
        let balance = scope
            .balance(request.from)
            .await?
            .ok_or(BankError::CustomerNotFound(request.from))?;

        if !Account::new(request.from, balance).can_cover(request.amount) {
            return Err(BankError::InsufficientFunds {
                customer: request.from,
                balance,
                required: request.amount,
            });
        }

        debug!(from = request.from, to = request.to, "applying transfer");
        if !scope.adjust_balance(request.from, -request.amount).await? {
            return Err(BankError::CustomerNotFound(request.from));
        }
        // A missing destination must abort the whole scope, debit included.
        if !scope.adjust_balance(request.to, request.amount).await? {
            return Err(BankError::CustomerNotFound(request.to));
        }

        let to_balance = scope
            .balance(request.to)
            .await?
            .ok_or(BankError::CustomerNotFound(request.to))?;

        Ok(TransferReceipt {
            from: request.from,
            to: request.to,
            amount: request.amount,
            from_balance: balance - request.amount,
            to_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn bank() -> Bank<MemoryStore> {
        Bank::new(MemoryStore::with_accounts([
            Account::new(0, 10000),
            Account::new(1, 0),
        ]))
    }

    #[tokio::test]
    async fn test_receipt_reports_post_commit_balances() {
        let bank = bank();
        let receipt = bank.transfer(0, 1, 2550).await.unwrap();
        assert_eq!(
            receipt,
            TransferReceipt {
                from: 0,
                to: 1,
                amount: 2550,
                from_balance: 7450,
                to_balance: 2550,
            }
        );
    }

    #[tokio::test]
    async fn test_exact_balance_can_be_transferred() {
        let bank = bank();
        bank.transfer(0, 1, 10000).await.unwrap();
        assert_eq!(bank.balance_for_customer(0).await.unwrap(), 0);
        assert_eq!(bank.balance_for_customer(1).await.unwrap(), 10000);
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_access() {
        let store = MemoryStore::with_accounts([Account::new(0, 10000)]);
        store.set_offline(true);
        let bank = Bank::new(store);

        assert!(matches!(
            bank.transfer(0, 1, 0).await,
            Err(BankError::InvalidAmount(_))
        ));
        assert!(matches!(
            bank.transfer(0, 0, 100).await,
            Err(BankError::SameAccount(0))
        ));
    }

    #[tokio::test]
    async fn test_offline_store_is_store_unavailable() {
        let bank = bank();
        bank.store().set_offline(true);
        let err = bank.transfer(0, 1, 1000).await.unwrap_err();
        assert!(matches!(err, BankError::StoreUnavailable(_)));
        assert!(!err.is_business_rule());

        bank.store().set_offline(false);
        assert_eq!(bank.balance_for_customer(0).await.unwrap(), 10000);
    }

    #[tokio::test]
    async fn test_total_holdings() {
        let bank = bank();
        assert_eq!(bank.total_holdings().await.unwrap(), 10000);
        bank.transfer(0, 1, 1234).await.unwrap();
        assert_eq!(bank.total_holdings().await.unwrap(), 10000);
    }

    #[tokio::test]
    async fn test_total_holdings_overflow() {
        let bank = Bank::new(MemoryStore::with_accounts([
            Account::new(0, i64::MAX),
            Account::new(1, 1),
        ]));
        assert!(matches!(
            bank.total_holdings().await,
            Err(BankError::StoreUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_during_apply_rolls_back() {
        let bank = bank().with_transfer_timeout(Duration::from_millis(100));
        bank.store().set_latency(Duration::from_millis(40));

        let result = bank.transfer(0, 1, 1000).await;
        assert!(
            matches!(result, Err(BankError::StoreUnavailable(_))),
            "expected a timeout, got {:?}",
            result
        );

        bank.store().set_latency(Duration::ZERO);
        assert_eq!(bank.balance_for_customer(0).await.unwrap(), 10000);
        assert_eq!(bank.balance_for_customer(1).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_commit_is_not_reported_as_failure() {
        // Four scope operations finish inside the timeout, the commit ends after it.
        let bank = bank().with_transfer_timeout(Duration::from_millis(225));
        bank.store().set_latency(Duration::from_millis(50));

        let receipt = bank.transfer(0, 1, 1000).await.unwrap();
        assert_eq!(receipt.from_balance, 9000);

        bank.store().set_latency(Duration::ZERO);
        assert_eq!(bank.balance_for_customer(0).await.unwrap(), 9000);
        assert_eq!(bank.balance_for_customer(1).await.unwrap(), 1000);
    }
}
