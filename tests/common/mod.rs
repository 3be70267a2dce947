// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use bankcore::{Account, Bank, BankConfig, MemoryStore, SqliteStore};
use tempfile::TempDir;

/// Seed data shared by every test database
pub const TESTDATA: &str = include_str!("../fixtures/testdata.sql");

/// A customer id absent from the fixture
pub const UNKNOWN_CUSTOMER: i64 = 100;

pub fn test_config(temp_dir: &TempDir) -> BankConfig {
    BankConfig::default().with_database_path(temp_dir.path().join("test.db"))
}

/// Helper to create a bank over a temporary SQLite database loaded with the fixture
pub async fn test_bank() -> Result<(Bank<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let bank = Bank::init(&test_config(&temp_dir)).await?;
    bank.store().load_fixture(TESTDATA).await?;
    Ok((bank, temp_dir))
}

/// Same accounts as the fixture, held in memory
pub fn memory_bank() -> Bank<MemoryStore> {
    Bank::new(MemoryStore::with_accounts([
        Account::new(0, 10000),
        Account::new(1, 0),
        Account::new(2, 25050),
    ]))
    .with_transfer_timeout(Duration::from_secs(5))
}
