use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Months, Utc};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    use_cases::{
        ledger::{AppRepo, TransactionRepo},
        metrics::MetricsUseCases,
        read_model::ReadModelBuilder,
    },
};

/// Outcome of syncing one app. `error` is set when that app failed; siblings
/// are unaffected.
#[derive(Debug)]
pub struct AppSyncResult {
    pub app_id: Uuid,
    pub app_name: String,
    pub transaction_count: usize,
    pub error: Option<AppError>,
}

impl AppSyncResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Pulls partner data for every app of a partner account into the ledger.
///
/// An `Err` means the account as a whole could not be processed.
#[async_trait]
pub trait SyncService: Send + Sync {
    async fn sync_all_apps(&self, partner_account_id: Uuid) -> AppResult<Vec<AppSyncResult>>;
}

/// Rebuilds the read model of every app whose sync succeeded.
///
/// A failed rebuild is reported on that app's result; the ledger write it
/// followed is kept.
pub struct ProjectingSyncService {
    inner: Arc<dyn SyncService>,
    builder: Arc<ReadModelBuilder>,
    metrics: Arc<MetricsUseCases>,
}

impl ProjectingSyncService {
    pub fn new(
        inner: Arc<dyn SyncService>,
        builder: Arc<ReadModelBuilder>,
        metrics: Arc<MetricsUseCases>,
    ) -> Self {
        Self {
            inner,
            builder,
            metrics,
        }
    }
}

#[async_trait]
impl SyncService for ProjectingSyncService {
    #[instrument(skip(self))]
    async fn sync_all_apps(&self, partner_account_id: Uuid) -> AppResult<Vec<AppSyncResult>> {
        let mut results = self.inner.sync_all_apps(partner_account_id).await?;

        for result in results.iter_mut().filter(|r| r.is_success()) {
            match self.builder.rebuild_for_app(result.app_id).await {
                Ok(_) => self.metrics.invalidate(result.app_id).await,
                Err(e) => {
                    warn!(
                        app_id = %result.app_id,
                        app = %result.app_name,
                        error = %e,
                        "Read model rebuild failed after sync"
                    );
                    result.error = Some(e);
                }
            }
        }
        Ok(results)
    }
}

/// Sync for deployments whose ledger is filled by an external ingester.
///
/// Never calls the partner API. Reports each app of the account with its
/// ledger transaction count over the last year.
pub struct LedgerSnapshotSync {
    apps: Arc<dyn AppRepo>,
    transactions: Arc<dyn TransactionRepo>,
}

impl LedgerSnapshotSync {
    pub fn new(apps: Arc<dyn AppRepo>, transactions: Arc<dyn TransactionRepo>) -> Self {
        Self { apps, transactions }
    }
}

#[async_trait]
impl SyncService for LedgerSnapshotSync {
    async fn sync_all_apps(&self, partner_account_id: Uuid) -> AppResult<Vec<AppSyncResult>> {
        let apps = self
            .apps
            .list_by_partner_account(partner_account_id)
            .await?;

        let now = Utc::now();
        let from = now.checked_sub_months(Months::new(12)).unwrap_or(now);

        let mut results = Vec::with_capacity(apps.len());
        for app in apps {
            let counted = self.transactions.count_by_app_id(app.id, from, now).await;
            let (transaction_count, error) = match counted {
                Ok(count) => (count as usize, None),
                Err(e) => (0, Some(e)),
            };
            results.push(AppSyncResult {
                app_id: app.id,
                app_name: app.name,
                transaction_count,
                error,
            });
        }
        Ok(results)
    }
}
