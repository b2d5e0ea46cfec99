use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::read_model::SubscriptionStatusRepo,
    domain::entities::read_model::SubscriptionStatus,
};

fn row_to_status(row: &sqlx::postgres::PgRow) -> SubscriptionStatus {
    SubscriptionStatus {
        id: row.get("id"),
        app_id: row.get("app_id"),
        subscription_id: row.get("subscription_id"),
        shopify_gid: row.get("shopify_gid"),
        myshopify_domain: row.get("myshopify_domain"),
        shop_name: row.get("shop_name"),
        plan_name: row.get("plan_name"),
        status: row.get("status"),
        risk_state: row.get("risk_state"),
        is_paid_current_cycle: row.get("is_paid_current_cycle"),
        months_overdue: row.get("months_overdue"),
        last_successful_charge_date: row.get("last_successful_charge_date"),
        expected_next_charge_date: row.get("expected_next_charge_date"),
        last_synced_at: row.get("last_synced_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, app_id, subscription_id, shopify_gid, myshopify_domain, shop_name, plan_name,
    status, risk_state, is_paid_current_cycle, months_overdue,
    last_successful_charge_date, expected_next_charge_date, last_synced_at
"#;

#[async_trait]
impl SubscriptionStatusRepo for PostgresPersistence {
    async fn upsert_batch(&self, rows: &[SubscriptionStatus]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO subscription_statuses (
                    id, app_id, subscription_id, shopify_gid, myshopify_domain, shop_name,
                    plan_name, status, risk_state, is_paid_current_cycle, months_overdue,
                    last_successful_charge_date, expected_next_charge_date, last_synced_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                ON CONFLICT (shopify_gid) DO UPDATE SET
                    app_id = EXCLUDED.app_id,
                    subscription_id = EXCLUDED.subscription_id,
                    myshopify_domain = EXCLUDED.myshopify_domain,
                    shop_name = EXCLUDED.shop_name,
                    plan_name = EXCLUDED.plan_name,
                    status = EXCLUDED.status,
                    risk_state = EXCLUDED.risk_state,
                    is_paid_current_cycle = EXCLUDED.is_paid_current_cycle,
                    months_overdue = EXCLUDED.months_overdue,
                    last_successful_charge_date = EXCLUDED.last_successful_charge_date,
                    expected_next_charge_date = EXCLUDED.expected_next_charge_date,
                    last_synced_at = EXCLUDED.last_synced_at
                "#,
            )
            .bind(row.id)
            .bind(row.app_id)
            .bind(row.subscription_id)
            .bind(&row.shopify_gid)
            .bind(&row.myshopify_domain)
            .bind(&row.shop_name)
            .bind(&row.plan_name)
            .bind(row.status)
            .bind(row.risk_state)
            .bind(row.is_paid_current_cycle)
            .bind(row.months_overdue)
            .bind(row.last_successful_charge_date)
            .bind(row.expected_next_charge_date)
            .bind(row.last_synced_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<SubscriptionStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_statuses WHERE app_id = $1 ORDER BY shop_name ASC, shopify_gid ASC",
            SELECT_COLS
        ))
        .bind(app_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_status).collect())
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM subscription_statuses WHERE app_id = $1")
            .bind(app_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
