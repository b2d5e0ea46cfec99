use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    infra::{
        config::AppConfig,
        kv_store::{InMemoryKeyValueStore, KeyValueStore, RedisKeyValueStore, SweepHandle},
        metrics_cache::KvMetricsCache,
        postgres_persistence,
        rate_limit::RateLimiter,
        sync_scheduler::SyncScheduler,
    },
    use_cases::{
        apps::AppUseCases,
        metrics::{MetricsCache, MetricsUseCases},
        read_model::ReadModelBuilder,
        sync::{LedgerSnapshotSync, ProjectingSyncService, SyncService},
    },
};

/// Long-running tasks owned by the process, stopped on shutdown.
pub struct Background {
    pub scheduler: SyncScheduler,
    pub sweeper: Option<SweepHandle>,
}

impl Background {
    pub async fn shutdown(self) {
        self.scheduler.stop().await;
        if let Some(sweeper) = self.sweeper {
            sweeper.stop().await;
        }
    }
}

pub async fn init_app_state() -> anyhow::Result<(AppState, Background)> {
    let config = AppConfig::from_env()?;

    let postgres = Arc::new(postgres_persistence(&config.database_url).await?);

    let (kv_store, sweeper): (Arc<dyn KeyValueStore>, Option<SweepHandle>) =
        match &config.redis_url {
            Some(redis_url) => (Arc::new(RedisKeyValueStore::new(redis_url).await?), None),
            None => {
                info!(
                    max_entries = config.kv_max_entries,
                    "REDIS_URL not set, using in-process TTL store"
                );
                let store = Arc::new(InMemoryKeyValueStore::new(config.kv_max_entries));
                let sweeper = store.spawn_sweeper(config.kv_sweep_interval);
                (store, Some(sweeper))
            }
        };

    let rate_limiter = Arc::new(RateLimiter::new(
        kv_store.clone(),
        config.rate_limit_window_secs,
        config.rate_limit_per_ip,
    ));
    let metrics_cache: Arc<dyn MetricsCache> =
        Arc::new(KvMetricsCache::new(kv_store, config.metrics_cache_ttl));

    let builder = Arc::new(ReadModelBuilder::new(
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
    ));
    let metrics_use_cases = Arc::new(MetricsUseCases::new(
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
        Some(metrics_cache),
        config.fee_tax_rate,
    ));
    let app_use_cases = Arc::new(AppUseCases::new(
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
        postgres.clone(),
        builder.clone(),
        metrics_use_cases.clone(),
    ));

    let sync: Arc<dyn SyncService> = Arc::new(ProjectingSyncService::new(
        Arc::new(LedgerSnapshotSync::new(postgres.clone(), postgres.clone())),
        builder,
        metrics_use_cases.clone(),
    ));
    let mut scheduler = SyncScheduler::new(postgres, sync);
    scheduler.set_interval(config.sync_interval)?;

    let app_state = AppState {
        config: Arc::new(config),
        app_use_cases,
        metrics_use_cases,
        rate_limiter,
    };

    Ok((app_state, Background { scheduler, sweeper }))
}

/// Console logs by default; one JSON object per line with `LOG_FORMAT=json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billing_sync=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let console_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false) // don’t show target (module path)
            .with_level(true)
    });

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
