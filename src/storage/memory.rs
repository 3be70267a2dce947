use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{Account, Cents, CustomerId};

use super::{AccountStore, LedgerScope};

/// In-process account store.
///
/// A scope holds the store lock for its whole lifetime, so scopes are fully
/// serialized. Writes are staged in the scope and applied on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<Mutex<BTreeMap<CustomerId, Cents>>>,
    offline: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts
            .into_iter()
            .map(|account| (account.customer_id, account.balance))
            .collect();
        Self {
            accounts: Arc::new(Mutex::new(map)),
            ..Self::default()
        }
    }

    /// Simulate a lost connection: while offline every operation fails,
    /// including those on scopes that are already open.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every operation on an open scope, commit included.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    fn ensure_online(offline: &AtomicBool) -> Result<()> {
        if offline.load(Ordering::SeqCst) {
            bail!("memory store is offline");
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope> {
        Self::ensure_online(&self.offline)?;
        let committed = self.accounts.clone().lock_owned().await;
        Ok(MemoryScope {
            committed,
            staged: BTreeMap::new(),
            offline: self.offline.clone(),
            latency_ms: self.latency_ms.clone(),
        })
    }

    async fn balance(&self, customer: CustomerId) -> Result<Option<Cents>> {
        Self::ensure_online(&self.offline)?;
        Ok(self.accounts.lock().await.get(&customer).copied())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        Self::ensure_online(&self.offline)?;
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .map(|(&customer_id, &balance)| Account::new(customer_id, balance))
            .collect())
    }
}

pub struct MemoryScope {
    committed: OwnedMutexGuard<BTreeMap<CustomerId, Cents>>,
    staged: BTreeMap<CustomerId, Cents>,
    offline: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryScope {
    async fn simulate_latency(&self) {
        let millis = self.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn current(&self, customer: CustomerId) -> Option<Cents> {
        self.staged
            .get(&customer)
            .or_else(|| self.committed.get(&customer))
            .copied()
    }
}

#[async_trait]
impl LedgerScope for MemoryScope {
    async fn balance(&mut self, customer: CustomerId) -> Result<Option<Cents>> {
        self.simulate_latency().await;
        MemoryStore::ensure_online(&self.offline)?;
        Ok(self.current(customer))
    }

    async fn adjust_balance(&mut self, customer: CustomerId, delta: Cents) -> Result<bool> {
        self.simulate_latency().await;
        MemoryStore::ensure_online(&self.offline)?;
        let Some(balance) = self.current(customer) else {
            return Ok(false);
        };
        let updated = balance
            .checked_add(delta)
            .ok_or_else(|| anyhow!("balance overflow for customer {}", customer))?;
        self.staged.insert(customer, updated);
        Ok(true)
    }

    async fn commit(mut self) -> Result<()> {
        self.simulate_latency().await;
        MemoryStore::ensure_online(&self.offline)?;
        let staged = std::mem::take(&mut self.staged);
        self.committed.extend(staged);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
