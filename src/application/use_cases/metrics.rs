use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        read_model::SubscriptionStatus,
        revenue_share::{FeeBreakdown, RevenueShareTier, calculate_fee_breakdown},
        risk_state::RiskState,
        subscription::SubscriptionState,
        transaction::Transaction,
    },
    use_cases::{
        ledger::{AppRepo, TransactionRepo},
        read_model::{SubscriptionStatusRepo, UsageStatusRepo},
    },
};

/// Trailing window for the revenue figure on the dashboard.
const REVENUE_WINDOW_DAYS: i64 = 30;

/// Dashboard aggregate for one app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppMetrics {
    pub app_id: Uuid,
    pub total_subscriptions: usize,
    pub active_subscriptions: usize,
    pub paid_current_cycle: usize,
    pub safe: usize,
    pub one_cycle_missed: usize,
    pub two_cycles_missed: usize,
    pub at_risk: usize,
    pub churned: usize,
    pub usage_records: usize,
    pub revenue_share_tier: RevenueShareTier,
    pub revenue: FeeBreakdown,
    pub computed_at: DateTime<Utc>,
}

/// Cache port for [`AppMetrics`]. Never a source of truth.
///
/// `MetricsUseCases` skips a `put` whose compute overlapped an invalidation,
/// so implementations need no ordering of their own.
#[async_trait]
pub trait MetricsCache: Send + Sync {
    async fn get(&self, app_id: Uuid) -> AppResult<Option<AppMetrics>>;
    async fn put(&self, metrics: &AppMetrics) -> AppResult<()>;
    async fn invalidate(&self, app_id: Uuid) -> AppResult<()>;
}

pub struct MetricsUseCases {
    apps: Arc<dyn AppRepo>,
    subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
    usage_statuses: Arc<dyn UsageStatusRepo>,
    transactions: Arc<dyn TransactionRepo>,
    cache: Option<Arc<dyn MetricsCache>>,
    tax_rate: f64,
    /// Bumped by every invalidation of an app.
    epochs: Mutex<HashMap<Uuid, u64>>,
}

impl MetricsUseCases {
    pub fn new(
        apps: Arc<dyn AppRepo>,
        subscription_statuses: Arc<dyn SubscriptionStatusRepo>,
        usage_statuses: Arc<dyn UsageStatusRepo>,
        transactions: Arc<dyn TransactionRepo>,
        cache: Option<Arc<dyn MetricsCache>>,
        tax_rate: f64,
    ) -> Self {
        Self {
            apps,
            subscription_statuses,
            usage_statuses,
            transactions,
            cache,
            tax_rate: tax_rate.clamp(0.0, 1.0),
            epochs: Mutex::new(HashMap::new()),
        }
    }

    /// Cached metrics when fresh, otherwise computed from the read model.
    ///
    /// Cache failures degrade to a recompute; they never fail the request.
    #[instrument(skip(self))]
    pub async fn app_metrics(&self, app_id: Uuid) -> AppResult<AppMetrics> {
        if let Some(cache) = &self.cache {
            match cache.get(app_id).await {
                Ok(Some(metrics)) => return Ok(metrics),
                Ok(None) => {}
                Err(e) => warn!(app_id = %app_id, error = %e, "Metrics cache read failed"),
            }
        }

        let started = self.epoch(app_id);
        let metrics = self.compute(app_id).await?;

        if let Some(cache) = &self.cache {
            if self.epoch(app_id) != started {
                debug!(app_id = %app_id, "Read model changed during compute, not caching");
            } else if let Err(e) = cache.put(&metrics).await {
                warn!(app_id = %app_id, error = %e, "Metrics cache write failed");
            } else if self.epoch(app_id) != started {
                // Invalidated between the check and the write.
                if let Err(e) = cache.invalidate(app_id).await {
                    warn!(app_id = %app_id, error = %e, "Metrics cache invalidation failed");
                }
            }
        }
        Ok(metrics)
    }

    /// Drop cached metrics after the read model changed.
    pub async fn invalidate(&self, app_id: Uuid) {
        *self
            .epochs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(app_id)
            .or_default() += 1;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.invalidate(app_id).await
        {
            warn!(app_id = %app_id, error = %e, "Metrics cache invalidation failed");
        }
    }

    fn epoch(&self, app_id: Uuid) -> u64 {
        self.epochs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&app_id)
            .copied()
            .unwrap_or(0)
    }

    async fn compute(&self, app_id: Uuid) -> AppResult<AppMetrics> {
        let app = self
            .apps
            .get_by_id(app_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let statuses = self.subscription_statuses.find_by_app_id(app_id).await?;
        let usage_records = self.usage_statuses.find_by_app_id(app_id).await?.len();

        let now = Utc::now();
        let transactions = self
            .transactions
            .find_by_app_id(app_id, now - Duration::days(REVENUE_WINDOW_DAYS), now)
            .await?;

        let tier = app.revenue_share_tier();
        let revenue =
            calculate_fee_breakdown(gross_revenue_cents(&transactions), tier, self.tax_rate);

        Ok(aggregate(app_id, &statuses, usage_records, tier, revenue, now))
    }
}

/// Revenue minus refunds, floored at zero. Refunds count by magnitude
/// whichever sign the partner reported them with.
fn gross_revenue_cents(transactions: &[Transaction]) -> i64 {
    let total: i64 = transactions
        .iter()
        .map(|t| {
            if t.charge_type.is_revenue() {
                t.net_amount_cents
            } else {
                -t.net_amount_cents.abs()
            }
        })
        .sum();
    total.max(0)
}

fn aggregate(
    app_id: Uuid,
    statuses: &[SubscriptionStatus],
    usage_records: usize,
    revenue_share_tier: RevenueShareTier,
    revenue: FeeBreakdown,
    computed_at: DateTime<Utc>,
) -> AppMetrics {
    let count = |state: RiskState| statuses.iter().filter(|s| s.risk_state == state).count();

    AppMetrics {
        app_id,
        total_subscriptions: statuses.len(),
        active_subscriptions: statuses
            .iter()
            .filter(|s| s.status == SubscriptionState::Active)
            .count(),
        paid_current_cycle: statuses.iter().filter(|s| s.is_paid_current_cycle).count(),
        safe: count(RiskState::Safe),
        one_cycle_missed: count(RiskState::OneCycleMissed),
        two_cycles_missed: count(RiskState::TwoCyclesMissed),
        at_risk: statuses.iter().filter(|s| s.risk_state.is_at_risk()).count(),
        churned: statuses.iter().filter(|s| s.risk_state.is_churned()).count(),
        usage_records,
        revenue_share_tier,
        revenue,
        computed_at,
    }
}
