use std::sync::Arc;

use crate::{
    infra::{RateLimiterTrait, config::AppConfig},
    use_cases::{apps::AppUseCases, metrics::MetricsUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub app_use_cases: Arc<AppUseCases>,
    pub metrics_use_cases: Arc<MetricsUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}
