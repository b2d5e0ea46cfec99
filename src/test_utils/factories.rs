//! Test data factories.
//!
//! Each factory returns a complete, valid object with sensible defaults and
//! a fresh `shopify_gid`. Use the closure parameter to override fields.
//! Dates are relative to now so repository windows pick them up.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    application::use_cases::ledger::AppProfile,
    domain::entities::{
        billing_interval::BillingInterval,
        read_model::SubscriptionStatus,
        risk_state::RiskState,
        subscription::{Subscription, SubscriptionState},
        transaction::{ChargeType, Transaction},
    },
};

pub const TEST_SHOP_DOMAIN: &str = "acme.myshopify.com";

/// Create a registered app on the default revenue-share tier.
pub fn create_test_app(overrides: impl FnOnce(&mut AppProfile)) -> AppProfile {
    let mut app = AppProfile {
        id: Uuid::new_v4(),
        partner_account_id: Uuid::new_v4(),
        name: "Test App".to_string(),
        revenue_share_tier: "DEFAULT_20".to_string(),
        created_at: Some(days_ago(90)),
    };
    overrides(&mut app);
    app
}

/// Create an active, paid-up monthly ledger subscription.
pub fn create_test_ledger_subscription(
    app_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let last_charge = days_ago(5);
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        app_id,
        shopify_gid: format!("gid://partners/AppSubscription/{}", Uuid::new_v4().simple()),
        myshopify_domain: TEST_SHOP_DOMAIN.to_string(),
        shop_name: "Acme Store".to_string(),
        plan_name: "Pro".to_string(),
        base_price_cents: 4900,
        billing_interval: BillingInterval::Monthly,
        status: SubscriptionState::Active,
        risk_state: RiskState::Safe,
        last_recurring_charge_date: Some(last_charge),
        expected_next_charge_date: Some(BillingInterval::Monthly.next_charge_date(last_charge)),
        created_at: Some(days_ago(60)),
        updated_at: Some(last_charge),
    };
    overrides(&mut subscription);
    subscription
}

/// Create a recurring charge from two days ago.
pub fn create_test_transaction(
    app_id: Uuid,
    overrides: impl FnOnce(&mut Transaction),
) -> Transaction {
    let mut transaction = Transaction {
        id: Uuid::new_v4(),
        app_id,
        shopify_gid: format!("gid://partners/AppSale/{}", Uuid::new_v4().simple()),
        myshopify_domain: TEST_SHOP_DOMAIN.to_string(),
        charge_type: ChargeType::Recurring,
        net_amount_cents: 4900,
        description: Some("Pro plan".to_string()),
        transaction_date: days_ago(2),
        created_at: Some(days_ago(2)),
    };
    overrides(&mut transaction);
    transaction
}

/// Create a projected status row for an active, safe subscription.
pub fn create_test_subscription_status(
    app_id: Uuid,
    overrides: impl FnOnce(&mut SubscriptionStatus),
) -> SubscriptionStatus {
    let mut status = SubscriptionStatus {
        id: Uuid::new_v4(),
        app_id,
        subscription_id: Uuid::new_v4(),
        shopify_gid: format!("gid://partners/AppSubscription/{}", Uuid::new_v4().simple()),
        myshopify_domain: TEST_SHOP_DOMAIN.to_string(),
        shop_name: "Acme Store".to_string(),
        plan_name: "Pro".to_string(),
        status: SubscriptionState::Active,
        risk_state: RiskState::Safe,
        is_paid_current_cycle: true,
        months_overdue: 0,
        last_successful_charge_date: Some(days_ago(5)),
        expected_next_charge_date: Some(days_ago(-25)),
        last_synced_at: Utc::now(),
    };
    overrides(&mut status);
    status
}

fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_use_fresh_gids() {
        let app_id = Uuid::new_v4();
        let a = create_test_ledger_subscription(app_id, |_| {});
        let b = create_test_ledger_subscription(app_id, |_| {});
        assert_ne!(a.shopify_gid, b.shopify_gid);
        assert!(a.is_paid_current_cycle());
    }

    #[test]
    fn test_overrides_apply() {
        let tx = create_test_transaction(Uuid::nil(), |t| t.charge_type = ChargeType::Usage);
        assert_eq!(tx.charge_type, ChargeType::Usage);
        assert_eq!(tx.app_id, Uuid::nil());
    }
}
