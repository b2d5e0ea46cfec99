//! In-memory implementations of the repository ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        ledger::{AppProfile, AppRepo, PartnerAccountRepo, SubscriptionRepo, TransactionRepo},
        read_model::{SubscriptionStatusRepo, UsageStatusRepo},
    },
    domain::entities::{
        read_model::{SubscriptionStatus, UsageStatus},
        subscription::Subscription,
        transaction::Transaction,
    },
};

fn read_failure() -> AppError {
    AppError::Database("connection reset".into())
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Keeps insertion order, which stands in for `created_at` ordering.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<Vec<Subscription>>,
    fail_reads: AtomicBool,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make `find_by_app_id` return a database error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<Subscription>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(read_failure());
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let now = Utc::now();

        match subscriptions
            .iter_mut()
            .find(|s| s.shopify_gid == subscription.shopify_gid)
        {
            Some(existing) => {
                let id = existing.id;
                let created_at = existing.created_at;
                *existing = Subscription {
                    id,
                    created_at,
                    updated_at: Some(now),
                    ..subscription.clone()
                };
                Ok(existing.clone())
            }
            None => {
                let stored = Subscription {
                    created_at: subscription.created_at.or(Some(now)),
                    updated_at: Some(now),
                    ..subscription.clone()
                };
                subscriptions.push(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.app_id != app_id);
        Ok((before - subscriptions.len()) as u64)
    }
}

// ============================================================================
// InMemoryTransactionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryTransactionRepo {
    pub transactions: Mutex<Vec<Transaction>>,
    fail_reads: AtomicBool,
}

impl InMemoryTransactionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions: Mutex::new(transactions),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionRepo for InMemoryTransactionRepo {
    async fn find_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(read_failure());
        }
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.app_id == app_id && t.transaction_date >= from && t.transaction_date <= to
            })
            .cloned()
            .collect())
    }

    async fn count_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64> {
        Ok(self.find_by_app_id(app_id, from, to).await?.len() as u64)
    }

    async fn upsert(&self, transaction: &Transaction) -> AppResult<Transaction> {
        let mut transactions = self.transactions.lock().unwrap();
        match transactions
            .iter_mut()
            .find(|t| t.shopify_gid == transaction.shopify_gid)
        {
            Some(existing) => {
                let id = existing.id;
                *existing = Transaction {
                    id,
                    ..transaction.clone()
                };
                Ok(existing.clone())
            }
            None => {
                transactions.push(transaction.clone());
                Ok(transaction.clone())
            }
        }
    }
}

// ============================================================================
// InMemoryPartnerAccountRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPartnerAccountRepo {
    pub ids: Mutex<Vec<Uuid>>,
    fail_reads: AtomicBool,
}

impl InMemoryPartnerAccountRepo {
    pub fn with_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Mutex::new(ids),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PartnerAccountRepo for InMemoryPartnerAccountRepo {
    async fn get_all_ids(&self) -> AppResult<Vec<Uuid>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(read_failure());
        }
        Ok(self.ids.lock().unwrap().clone())
    }
}

// ============================================================================
// InMemoryAppRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryAppRepo {
    pub apps: Mutex<HashMap<Uuid, AppProfile>>,
}

impl InMemoryAppRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps(apps: Vec<AppProfile>) -> Self {
        Self {
            apps: Mutex::new(apps.into_iter().map(|a| (a.id, a)).collect()),
        }
    }
}

#[async_trait]
impl AppRepo for InMemoryAppRepo {
    async fn get_by_id(&self, app_id: Uuid) -> AppResult<Option<AppProfile>> {
        Ok(self.apps.lock().unwrap().get(&app_id).cloned())
    }

    async fn list_by_partner_account(
        &self,
        partner_account_id: Uuid,
    ) -> AppResult<Vec<AppProfile>> {
        let mut apps: Vec<AppProfile> = self
            .apps
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.partner_account_id == partner_account_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }
}

// ============================================================================
// Read model
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionStatusRepo {
    pub rows: Mutex<Vec<SubscriptionStatus>>,
}

impl InMemorySubscriptionStatusRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStatusRepo for InMemorySubscriptionStatusRepo {
    async fn upsert_batch(&self, rows: &[SubscriptionStatus]) -> AppResult<()> {
        let mut stored = self.rows.lock().unwrap();
        for row in rows {
            match stored.iter_mut().find(|r| r.shopify_gid == row.shopify_gid) {
                Some(existing) => {
                    let id = existing.id;
                    *existing = SubscriptionStatus { id, ..row.clone() };
                }
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<SubscriptionStatus>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.app_id != app_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryUsageStatusRepo {
    pub rows: Mutex<Vec<UsageStatus>>,
}

impl InMemoryUsageStatusRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStatusRepo for InMemoryUsageStatusRepo {
    async fn upsert_batch(&self, rows: &[UsageStatus]) -> AppResult<()> {
        let mut stored = self.rows.lock().unwrap();
        for row in rows {
            match stored.iter_mut().find(|r| r.shopify_gid == row.shopify_gid) {
                Some(existing) => {
                    let id = existing.id;
                    *existing = UsageStatus { id, ..row.clone() };
                }
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<UsageStatus>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.app_id != app_id);
        Ok((before - rows.len()) as u64)
    }
}
