//! Query-side rows projected from the ledger.
//!
//! These tables are disposable: every row can be recomputed from the ledger by
//! `ReadModelBuilder::rebuild_for_app`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{risk_state::RiskState, subscription::SubscriptionState};

/// Projected billing health of one subscription. Keyed by `shopify_gid`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionStatus {
    pub id: Uuid,
    pub app_id: Uuid,
    pub subscription_id: Uuid,
    pub shopify_gid: String,
    pub myshopify_domain: String,
    pub shop_name: String,
    pub plan_name: String,
    pub status: SubscriptionState,
    pub risk_state: RiskState,
    /// Always equal to `status == ACTIVE && risk_state == SAFE`.
    pub is_paid_current_cycle: bool,
    pub months_overdue: i32,
    pub last_successful_charge_date: Option<DateTime<Utc>>,
    pub expected_next_charge_date: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
}

/// Projected usage charge, joined to its subscription. Keyed by `shopify_gid`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStatus {
    pub id: Uuid,
    pub app_id: Uuid,
    pub shopify_gid: String,
    pub subscription_gid: String,
    pub myshopify_domain: String,
    pub billed: bool,
    pub billing_date: DateTime<Utc>,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}
