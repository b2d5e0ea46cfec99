use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        read_model::{SubscriptionStatus, UsageStatus},
        subscription::Subscription,
        transaction::ChargeType,
    },
    use_cases::ledger::{SubscriptionRepo, TransactionRepo},
};

/// How far back usage charges are projected.
const USAGE_WINDOW_MONTHS: u32 = 12;

#[async_trait]
pub trait SubscriptionStatusRepo: Send + Sync {
    /// Insert or update by `shopify_gid`. An existing row keeps its `id`.
    async fn upsert_batch(&self, rows: &[SubscriptionStatus]) -> AppResult<()>;
    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<SubscriptionStatus>>;
    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait UsageStatusRepo: Send + Sync {
    /// Insert or update by `shopify_gid`. An existing row keeps its `id`.
    async fn upsert_batch(&self, rows: &[UsageStatus]) -> AppResult<()>;
    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<UsageStatus>>;
    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64>;
}

/// Row counts of one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    pub subscriptions: usize,
    pub usage_records: usize,
    /// Usage charges whose shop has no subscription in the ledger.
    pub dropped_usage: usize,
}

/// Rebuilds the query-side status tables of one app from its ledger.
///
/// Rebuilds are upsert-only: rows of subscriptions that vanished from the
/// ledger stay until the app is torn down. Two rebuilds of the same app never
/// interleave; different apps rebuild in parallel.
pub struct ReadModelBuilder {
    subscriptions: Arc<dyn SubscriptionRepo>,
    transactions: Arc<dyn TransactionRepo>,
    subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
    usage_statuses: Arc<dyn UsageStatusRepo>,
    app_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ReadModelBuilder {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepo>,
        transactions: Arc<dyn TransactionRepo>,
        subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
        usage_statuses: Arc<dyn UsageStatusRepo>,
    ) -> Self {
        Self {
            subscriptions,
            transactions,
            subscription_statuses,
            usage_statuses,
            app_locks: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub async fn rebuild_for_app(&self, app_id: Uuid) -> AppResult<RebuildSummary> {
        let summary = self
            .with_app_lock(app_id, async { self.rebuild_locked(app_id, Utc::now()).await })
            .await?;
        info!(
            app_id = %app_id,
            subscriptions = summary.subscriptions,
            usage_records = summary.usage_records,
            dropped_usage = summary.dropped_usage,
            "Read model rebuilt"
        );
        Ok(summary)
    }

    async fn rebuild_locked(&self, app_id: Uuid, now: DateTime<Utc>) -> AppResult<RebuildSummary> {
        let subscriptions = self.rebuild_subscription_statuses(app_id, now).await?;
        let (usage_records, dropped_usage) = self
            .rebuild_usage_statuses(app_id, &subscriptions, now)
            .await?;

        Ok(RebuildSummary {
            subscriptions: subscriptions.len(),
            usage_records,
            dropped_usage,
        })
    }

    /// Step 1. Returns the ledger subscriptions so step 2 can join against them.
    async fn rebuild_subscription_statuses(
        &self,
        app_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let subscriptions = self.subscriptions.find_by_app_id(app_id).await?;

        let rows: Vec<SubscriptionStatus> = subscriptions
            .iter()
            .map(|s| project_subscription(s, now))
            .collect();

        if !rows.is_empty() {
            self.subscription_statuses.upsert_batch(&rows).await?;
        }
        Ok(subscriptions)
    }

    /// Step 2. Returns `(written, dropped)`.
    async fn rebuild_usage_statuses(
        &self,
        app_id: Uuid,
        subscriptions: &[Subscription],
        now: DateTime<Utc>,
    ) -> AppResult<(usize, usize)> {
        let from = now
            .checked_sub_months(Months::new(USAGE_WINDOW_MONTHS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let transactions = self.transactions.find_by_app_id(app_id, from, now).await?;

        // Subscriptions come oldest first, so the newest one wins for a shop.
        let by_domain: HashMap<&str, &Subscription> = subscriptions
            .iter()
            .map(|s| (s.myshopify_domain.as_str(), s))
            .collect();

        let mut rows = Vec::new();
        let mut dropped = 0;
        for tx in transactions
            .iter()
            .filter(|t| t.charge_type == ChargeType::Usage)
        {
            let Some(subscription) = by_domain.get(tx.myshopify_domain.as_str()) else {
                debug!(
                    app_id = %app_id,
                    transaction = %tx.shopify_gid,
                    shop = %tx.myshopify_domain,
                    "Usage charge has no subscription, skipping"
                );
                dropped += 1;
                continue;
            };
            rows.push(UsageStatus {
                id: Uuid::new_v4(),
                app_id,
                shopify_gid: tx.shopify_gid.clone(),
                subscription_gid: subscription.shopify_gid.clone(),
                myshopify_domain: tx.myshopify_domain.clone(),
                // Only recorded charges reach the ledger.
                billed: true,
                billing_date: tx.transaction_date,
                amount_cents: tx.net_amount_cents,
                description: tx.description.clone(),
                last_synced_at: now,
            });
        }

        if !rows.is_empty() {
            self.usage_statuses.upsert_batch(&rows).await?;
        }
        Ok((rows.len(), dropped))
    }

    /// Run `work` while holding the app's rebuild lock.
    ///
    /// Anything that deletes an app's rows must go through here, or a rebuild
    /// in flight re-inserts what it loaded before the delete.
    pub async fn with_app_lock<F, T>(&self, app_id: Uuid, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let lock = self.app_lock(app_id);
        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.release_app_lock(app_id);
        result
    }

    fn app_lock(&self, app_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.app_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(app_id).or_default().clone()
    }

    /// Drops the map entry once nobody else holds or waits on it.
    fn release_app_lock(&self, app_id: Uuid) {
        let mut locks = self.app_locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&app_id)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&app_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.app_locks.lock().unwrap().len()
    }
}

fn project_subscription(subscription: &Subscription, now: DateTime<Utc>) -> SubscriptionStatus {
    SubscriptionStatus {
        id: Uuid::new_v4(),
        app_id: subscription.app_id,
        subscription_id: subscription.id,
        shopify_gid: subscription.shopify_gid.clone(),
        myshopify_domain: subscription.myshopify_domain.clone(),
        shop_name: subscription.shop_name.clone(),
        plan_name: subscription.plan_name.clone(),
        status: subscription.status,
        risk_state: subscription.risk_state,
        is_paid_current_cycle: subscription.is_paid_current_cycle(),
        months_overdue: subscription.months_overdue(now),
        last_successful_charge_date: subscription.last_recurring_charge_date,
        expected_next_charge_date: subscription.expected_next_charge_date,
        last_synced_at: now,
    }
}
