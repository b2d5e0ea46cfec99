//! Builds an `AppState` over in-memory stores for HTTP-level tests.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        apps::AppUseCases, ledger::AppProfile, metrics::MetricsUseCases,
        read_model::ReadModelBuilder,
    },
    infra::{
        config::AppConfig, kv_store::InMemoryKeyValueStore, metrics_cache::KvMetricsCache,
        rate_limit::RateLimiter, sync_scheduler::DEFAULT_SYNC_INTERVAL,
    },
    test_utils::{
        InMemoryAppRepo, InMemorySubscriptionRepo, InMemorySubscriptionStatusRepo,
        InMemoryTransactionRepo, InMemoryUsageStatusRepo,
    },
};

/// The built state plus handles for seeding the ledger.
pub struct TestAppState {
    pub state: AppState,
    pub subscriptions: Arc<InMemorySubscriptionRepo>,
    pub transactions: Arc<InMemoryTransactionRepo>,
}

pub struct TestAppStateBuilder {
    apps: Vec<AppProfile>,
    rate_limit_per_ip: u64,
    trust_proxy: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            apps: Vec::new(),
            rate_limit_per_ip: u64::MAX,
            trust_proxy: false,
        }
    }

    pub fn with_app(mut self, app: AppProfile) -> Self {
        self.apps.push(app);
        self
    }

    pub fn with_rate_limit(mut self, per_ip: u64) -> Self {
        self.rate_limit_per_ip = per_ip;
        self
    }

    pub fn trust_proxy(mut self) -> Self {
        self.trust_proxy = true;
        self
    }

    pub fn build(self) -> TestAppState {
        let apps = Arc::new(InMemoryAppRepo::with_apps(self.apps));
        let subscriptions = Arc::new(InMemorySubscriptionRepo::new());
        let transactions = Arc::new(InMemoryTransactionRepo::new());
        let statuses = Arc::new(InMemorySubscriptionStatusRepo::new());
        let usage = Arc::new(InMemoryUsageStatusRepo::new());
        let kv_store = Arc::new(InMemoryKeyValueStore::new(1_000));

        let builder = Arc::new(ReadModelBuilder::new(
            subscriptions.clone(),
            transactions.clone(),
            statuses.clone(),
            usage.clone(),
        ));
        let metrics_use_cases = Arc::new(MetricsUseCases::new(
            apps.clone(),
            statuses.clone(),
            usage.clone(),
            transactions.clone(),
            Some(Arc::new(KvMetricsCache::new(
                kv_store.clone(),
                Duration::from_secs(300),
            ))),
            0.0,
        ));
        let app_use_cases = Arc::new(AppUseCases::new(
            apps,
            subscriptions.clone(),
            statuses,
            usage,
            builder,
            metrics_use_cases.clone(),
        ));

        let config = Arc::new(AppConfig {
            database_url: SecretString::new("postgres://test".into()),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            redis_url: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            fee_tax_rate: 0.0,
            rate_limit_window_secs: 60,
            rate_limit_per_ip: self.rate_limit_per_ip,
            metrics_cache_ttl: Duration::from_secs(300),
            kv_max_entries: 1_000,
            kv_sweep_interval: Duration::from_secs(60),
            trust_proxy: self.trust_proxy,
        });

        let state = AppState {
            rate_limiter: Arc::new(RateLimiter::new(
                kv_store,
                config.rate_limit_window_secs,
                config.rate_limit_per_ip,
            )),
            config,
            app_use_cases,
            metrics_use_cases,
        };

        TestAppState {
            state,
            subscriptions,
            transactions,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
