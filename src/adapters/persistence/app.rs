use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::{AppProfile, AppRepo},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> AppProfile {
    AppProfile {
        id: row.get("id"),
        partner_account_id: row.get("partner_account_id"),
        name: row.get("name"),
        revenue_share_tier: row.get("revenue_share_tier"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, partner_account_id, name, revenue_share_tier, created_at";

#[async_trait]
impl AppRepo for PostgresPersistence {
    async fn get_by_id(&self, app_id: Uuid) -> AppResult<Option<AppProfile>> {
        let row = sqlx::query(&format!("SELECT {} FROM apps WHERE id = $1", SELECT_COLS))
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list_by_partner_account(
        &self,
        partner_account_id: Uuid,
    ) -> AppResult<Vec<AppProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM apps WHERE partner_account_id = $1 ORDER BY name ASC",
            SELECT_COLS
        ))
        .bind(partner_account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }
}
