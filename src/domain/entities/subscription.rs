use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{billing_interval::BillingInterval, risk_state::RiskState};

/// Days per "month" when estimating how far behind a subscription is.
pub const OVERDUE_MONTH_DAYS: i64 = BillingInterval::Monthly.days_in_cycle();

/// Partner-reported lifecycle status of a subscription.
///
/// Parsing is exact: the partner sends upper-case literals and anything else
/// is rejected rather than guessed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionState {
    Active,
    Cancelled,
    Frozen,
    Expired,
    Pending,
}

/// Ledger record of one partner subscription. One live row per `shopify_gid`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub app_id: Uuid,
    pub shopify_gid: String,
    pub myshopify_domain: String,
    pub shop_name: String,
    pub plan_name: String,
    pub base_price_cents: i64,
    pub billing_interval: BillingInterval,
    pub status: SubscriptionState,
    pub risk_state: RiskState,
    pub last_recurring_charge_date: Option<DateTime<Utc>>,
    pub expected_next_charge_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Paid up for the running cycle: active and not behind on any charge.
    pub fn is_paid_current_cycle(&self) -> bool {
        self.status == SubscriptionState::Active && self.risk_state == RiskState::Safe
    }

    pub fn months_overdue(&self, now: DateTime<Utc>) -> i32 {
        months_overdue(self.expected_next_charge_date, now)
    }
}

/// Whole nominal months elapsed since the expected charge date.
///
/// Zero when there is no expected date or it is not yet in the past.
pub fn months_overdue(expected: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i32 {
    let Some(expected) = expected else {
        return 0;
    };
    if expected >= now {
        return 0;
    }
    let days = (now - expected).num_days();
    (days / OVERDUE_MONTH_DAYS).max(0) as i32
}
