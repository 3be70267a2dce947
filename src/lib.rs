pub mod application;
pub mod config;
pub mod domain;
pub mod storage;

pub use application::{Bank, BankError};
pub use config::BankConfig;
pub use domain::*;
pub use storage::{AccountStore, LedgerScope, MemoryStore, SqliteStore};
