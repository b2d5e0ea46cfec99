use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::read_model::UsageStatusRepo,
    domain::entities::read_model::UsageStatus,
};

fn row_to_usage(row: &sqlx::postgres::PgRow) -> UsageStatus {
    UsageStatus {
        id: row.get("id"),
        app_id: row.get("app_id"),
        shopify_gid: row.get("shopify_gid"),
        subscription_gid: row.get("subscription_gid"),
        myshopify_domain: row.get("myshopify_domain"),
        billed: row.get("billed"),
        billing_date: row.get("billing_date"),
        amount_cents: row.get("amount_cents"),
        description: row.get("description"),
        last_synced_at: row.get("last_synced_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, app_id, shopify_gid, subscription_gid, myshopify_domain, billed,
    billing_date, amount_cents, description, last_synced_at
"#;

#[async_trait]
impl UsageStatusRepo for PostgresPersistence {
    async fn upsert_batch(&self, rows: &[UsageStatus]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO usage_statuses (
                    id, app_id, shopify_gid, subscription_gid, myshopify_domain, billed,
                    billing_date, amount_cents, description, last_synced_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (shopify_gid) DO UPDATE SET
                    app_id = EXCLUDED.app_id,
                    subscription_gid = EXCLUDED.subscription_gid,
                    myshopify_domain = EXCLUDED.myshopify_domain,
                    billed = EXCLUDED.billed,
                    billing_date = EXCLUDED.billing_date,
                    amount_cents = EXCLUDED.amount_cents,
                    description = EXCLUDED.description,
                    last_synced_at = EXCLUDED.last_synced_at
                "#,
            )
            .bind(row.id)
            .bind(row.app_id)
            .bind(&row.shopify_gid)
            .bind(&row.subscription_gid)
            .bind(&row.myshopify_domain)
            .bind(row.billed)
            .bind(row.billing_date)
            .bind(row.amount_cents)
            .bind(&row.description)
            .bind(row.last_synced_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_app_id(&self, app_id: Uuid) -> AppResult<Vec<UsageStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM usage_statuses WHERE app_id = $1 ORDER BY billing_date DESC",
            SELECT_COLS
        ))
        .bind(app_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_usage).collect())
    }

    async fn delete_by_app_id(&self, app_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM usage_statuses WHERE app_id = $1")
            .bind(app_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
