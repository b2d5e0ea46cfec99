use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::SubscriptionRepo,
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        app_id: row.get("app_id"),
        shopify_gid: row.get("shopify_gid"),
        myshopify_domain: row.get("myshopify_domain"),
        shop_name: row.get("shop_name"),
        plan_name: row.get("plan_name"),
        base_price_cents: row.get("base_price_cents"),
        billing_interval: row.get("billing_interval"),
        status: row.get("status"),
        risk_state: row.get("risk_state"),
        last_recurring_charge_date: row.get("last_recurring_charge_date"),
        expected_next_charge_date: row.get("expected_next_charge_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, app_id, shopify_gid, myshopify_domain, shop_name, plan_name,
    base_price_cents, billing_interval, status, risk_state,
    last_recurring_charge_date, expected_next_charge_date, created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE app_id = $1 ORDER BY created_at ASC, id ASC",
            SELECT_COLS
        ))
        .bind(app_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn upsert(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, app_id, shopify_gid, myshopify_domain, shop_name, plan_name,
                base_price_cents, billing_interval, status, risk_state,
                last_recurring_charge_date, expected_next_charge_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (shopify_gid) DO UPDATE SET
                app_id = EXCLUDED.app_id,
                myshopify_domain = EXCLUDED.myshopify_domain,
                shop_name = EXCLUDED.shop_name,
                plan_name = EXCLUDED.plan_name,
                base_price_cents = EXCLUDED.base_price_cents,
                billing_interval = EXCLUDED.billing_interval,
                status = EXCLUDED.status,
                risk_state = EXCLUDED.risk_state,
                last_recurring_charge_date = EXCLUDED.last_recurring_charge_date,
                expected_next_charge_date = EXCLUDED.expected_next_charge_date,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(subscription.id)
        .bind(subscription.app_id)
        .bind(&subscription.shopify_gid)
        .bind(&subscription.myshopify_domain)
        .bind(&subscription.shop_name)
        .bind(&subscription.plan_name)
        .bind(subscription.base_price_cents)
        .bind(subscription.billing_interval)
        .bind(subscription.status)
        .bind(subscription.risk_state)
        .bind(subscription.last_recurring_charge_date)
        .bind(subscription.expected_next_charge_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE app_id = $1")
            .bind(app_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
