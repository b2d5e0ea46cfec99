use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::read_model::{SubscriptionStatus, UsageStatus},
    use_cases::{
        ledger::{AppProfile, AppRepo, SubscriptionRepo},
        metrics::MetricsUseCases,
        read_model::{ReadModelBuilder, RebuildSummary, SubscriptionStatusRepo, UsageStatusRepo},
    },
};

/// A usage row with the status row of the subscription it was billed under.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub usage: UsageStatus,
    /// `None` when the subscription row was torn down separately.
    pub subscription: Option<SubscriptionStatus>,
}

/// Rows removed by [`AppUseCases::teardown_app`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownSummary {
    pub subscriptions: u64,
    pub subscription_statuses: u64,
    pub usage_statuses: u64,
}

/// Per-app queries and maintenance over the ledger and its read model.
pub struct AppUseCases {
    apps: Arc<dyn AppRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
    usage_statuses: Arc<dyn UsageStatusRepo>,
    builder: Arc<ReadModelBuilder>,
    metrics: Arc<MetricsUseCases>,
}

impl AppUseCases {
    pub fn new(
        apps: Arc<dyn AppRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
        usage_statuses: Arc<dyn UsageStatusRepo>,
        builder: Arc<ReadModelBuilder>,
        metrics: Arc<MetricsUseCases>,
    ) -> Self {
        Self {
            apps,
            subscriptions,
            subscription_statuses,
            usage_statuses,
            builder,
            metrics,
        }
    }

    pub async fn subscription_statuses(&self, app_id: Uuid) -> AppResult<Vec<SubscriptionStatus>> {
        self.require_app(app_id).await?;
        self.subscription_statuses.find_by_app_id(app_id).await
    }

    pub async fn usage_records(&self, app_id: Uuid) -> AppResult<Vec<UsageRecord>> {
        self.require_app(app_id).await?;

        let by_gid: HashMap<String, SubscriptionStatus> = self
            .subscription_statuses
            .find_by_app_id(app_id)
            .await?
            .into_iter()
            .map(|s| (s.shopify_gid.clone(), s))
            .collect();

        let usage = self.usage_statuses.find_by_app_id(app_id).await?;
        Ok(usage
            .into_iter()
            .map(|usage| UsageRecord {
                subscription: by_gid.get(&usage.subscription_gid).cloned(),
                usage,
            })
            .collect())
    }

    /// Rebuild the read model now instead of waiting for the next sync pass.
    #[instrument(skip(self))]
    pub async fn resync_app(&self, app_id: Uuid) -> AppResult<RebuildSummary> {
        self.require_app(app_id).await?;
        let summary = self.builder.rebuild_for_app(app_id).await?;
        self.metrics.invalidate(app_id).await;
        Ok(summary)
    }

    /// Delete the app's ledger subscriptions and both read-model tables.
    ///
    /// The registry row and ledger transactions are owned elsewhere and kept.
    /// Waits for any rebuild of the app in flight.
    #[instrument(skip(self))]
    pub async fn teardown_app(&self, app_id: Uuid) -> AppResult<TeardownSummary> {
        self.require_app(app_id).await?;

        let summary = self
            .builder
            .with_app_lock(app_id, async {
                Ok::<_, AppError>(TeardownSummary {
                    usage_statuses: self.usage_statuses.delete_by_app_id(app_id).await?,
                    subscription_statuses: self
                        .subscription_statuses
                        .delete_by_app_id(app_id)
                        .await?,
                    subscriptions: self.subscriptions.delete_by_app_id(app_id).await?,
                })
            })
            .await?;
        self.metrics.invalidate(app_id).await;

        info!(
            app_id = %app_id,
            subscriptions = summary.subscriptions,
            subscription_statuses = summary.subscription_statuses,
            usage_statuses = summary.usage_statuses,
            "App torn down"
        );
        Ok(summary)
    }

    async fn require_app(&self, app_id: Uuid) -> AppResult<AppProfile> {
        self.apps.get_by_id(app_id).await?.ok_or(AppError::NotFound)
    }
}
