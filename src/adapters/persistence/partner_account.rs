use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::ledger::PartnerAccountRepo,
};

#[async_trait]
impl PartnerAccountRepo for PostgresPersistence {
    async fn get_all_ids(&self) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT DISTINCT partner_account_id FROM apps ORDER BY partner_account_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(|r| r.get("partner_account_id")).collect())
    }
}
