//! Ledger and app-registry contracts.
//!
//! The ledger is written by the partner sync client and read by the
//! projection. `upsert` keyed by `shopify_gid` is the only ledger write path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        revenue_share::RevenueShareTier, subscription::Subscription, transaction::Transaction,
    },
};

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    /// All subscriptions of an app, oldest first.
    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<Subscription>>;
    async fn upsert(&self, subscription: &Subscription) -> AppResult<Subscription>;
    /// App teardown only. Returns the number of deleted rows.
    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait TransactionRepo: Send + Sync {
    /// Transactions of an app with `from <= transaction_date <= to`.
    async fn find_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>>;
    /// Same range as [`TransactionRepo::find_by_app_id`], counted in the store.
    async fn count_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64>;
    async fn upsert(&self, transaction: &Transaction) -> AppResult<Transaction>;
}

#[async_trait]
pub trait PartnerAccountRepo: Send + Sync {
    /// Distinct partner account ids with at least one registered app.
    async fn get_all_ids(&self) -> AppResult<Vec<Uuid>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct AppProfile {
    pub id: Uuid,
    pub partner_account_id: Uuid,
    pub name: String,
    /// Stored literal; see [`AppProfile::revenue_share_tier`].
    pub revenue_share_tier: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl AppProfile {
    pub fn revenue_share_tier(&self) -> RevenueShareTier {
        RevenueShareTier::parse_or_default(&self.revenue_share_tier)
    }
}

#[async_trait]
pub trait AppRepo: Send + Sync {
    async fn get_by_id(&self, app_id: Uuid) -> AppResult<Option<AppProfile>>;
    async fn list_by_partner_account(&self, partner_account_id: Uuid)
    -> AppResult<Vec<AppProfile>>;
}
