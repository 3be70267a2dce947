use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::config::BankConfig;
use crate::domain::{Account, Cents, CustomerId};

use super::{AccountStore, LedgerScope, MIGRATION_001_ACCOUNTS};

/// SQLite-backed account store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to an existing database.
    pub async fn connect(config: &BankConfig) -> Result<Self> {
        Self::open(config, false).await
    }

    /// Initialize a database (create if missing + migrate).
    pub async fn init(config: &BankConfig) -> Result<Self> {
        let store = Self::open(config, true).await?;
        store.migrate().await?;
        Ok(store)
    }

    async fn open(config: &BankConfig, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {}",
                    config.database_path.display()
                )
            })?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Execute a SQL fixture (seed data) against the database.
    pub async fn load_fixture(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .context("Failed to load fixture")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    type Scope = SqliteScope;

    async fn begin(&self) -> Result<SqliteScope> {
        // IMMEDIATE takes the write lock up front, so the balance read inside the
        // scope cannot go stale before the debit lands.
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin transaction")?;
        Ok(SqliteScope { tx })
    }

    async fn balance(&self, customer: CustomerId) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE customer_id = ?")
            .bind(customer)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        row.map(|row| row.try_get("balance"))
            .transpose()
            .context("Failed to decode balance")
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query("SELECT customer_id, balance FROM accounts ORDER BY customer_id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter()
            .map(|row| -> Result<Account> {
                Ok(Account::new(
                    row.try_get("customer_id")
                        .context("Failed to decode customer id")?,
                    row.try_get("balance").context("Failed to decode balance")?,
                ))
            })
            .collect()
    }
}

/// A SQLite transaction. sqlx rolls it back when dropped uncommitted.
pub struct SqliteScope {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LedgerScope for SqliteScope {
    async fn balance(&mut self, customer: CustomerId) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE customer_id = ?")
            .bind(customer)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch balance")?;

        row.map(|row| row.try_get("balance"))
            .transpose()
            .context("Failed to decode balance")
    }

    async fn adjust_balance(&mut self, customer: CustomerId, delta: Cents) -> Result<bool> {
        // SQLite silently widens an overflowing integer to REAL, so the sum is
        // checked here instead of in the UPDATE.
        let Some(balance) = self.balance(customer).await? else {
            return Ok(false);
        };
        let updated = balance
            .checked_add(delta)
            .ok_or_else(|| anyhow!("balance overflow for customer {}", customer))?;

        let result = sqlx::query("UPDATE accounts SET balance = ? WHERE customer_id = ?")
            .bind(updated)
            .bind(customer)
            .execute(&mut *self.tx)
            .await
            .context("Failed to update balance")?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")
    }
}
