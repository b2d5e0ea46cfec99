use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::TransactionRepo,
    domain::entities::transaction::Transaction,
};

fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        app_id: row.get("app_id"),
        shopify_gid: row.get("shopify_gid"),
        myshopify_domain: row.get("myshopify_domain"),
        charge_type: row.get("charge_type"),
        net_amount_cents: row.get("net_amount_cents"),
        description: row.get("description"),
        transaction_date: row.get("transaction_date"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, app_id, shopify_gid, myshopify_domain, charge_type, net_amount_cents,
    description, transaction_date, created_at
"#;

#[async_trait]
impl TransactionRepo for PostgresPersistence {
    async fn find_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE app_id = $1 AND transaction_date >= $2 AND transaction_date <= $3
            ORDER BY transaction_date ASC
            "#,
            SELECT_COLS
        ))
        .bind(app_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_transaction).collect())
    }

    async fn count_by_app_id(
        &self,
        app_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE app_id = $1 AND transaction_date >= $2 AND transaction_date <= $3
            "#,
        )
        .bind(app_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(count.max(0) as u64)
    }

    async fn upsert(&self, transaction: &Transaction) -> AppResult<Transaction> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions (
                id, app_id, shopify_gid, myshopify_domain, charge_type,
                net_amount_cents, description, transaction_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (shopify_gid) DO UPDATE SET
                app_id = EXCLUDED.app_id,
                myshopify_domain = EXCLUDED.myshopify_domain,
                charge_type = EXCLUDED.charge_type,
                net_amount_cents = EXCLUDED.net_amount_cents,
                description = EXCLUDED.description,
                transaction_date = EXCLUDED.transaction_date
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(transaction.id)
        .bind(transaction.app_id)
        .bind(&transaction.shopify_gid)
        .bind(&transaction.myshopify_domain)
        .bind(transaction.charge_type)
        .bind(transaction.net_amount_cents)
        .bind(&transaction.description)
        .bind(transaction.transaction_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_transaction(&row))
    }
}
