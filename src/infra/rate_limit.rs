use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::kv_store::KeyValueStore;
use crate::app_error::{AppError, AppResult};

/// Trait for rate limiting implementations.
#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Returns Ok(()) if the IP is within its limit, Err(AppError::RateLimited) if exceeded.
    async fn check(&self, ip: &str) -> AppResult<()>;
}

/// Fixed-window per-IP limiter over a [`KeyValueStore`] counter.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    window: Duration,
    max_per_ip: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, window_secs: u64, max_per_ip: u64) -> Self {
        Self {
            store,
            window: Duration::from_secs(window_secs),
            max_per_ip,
        }
    }
}

#[async_trait]
impl RateLimiterTrait for RateLimiter {
    async fn check(&self, ip: &str) -> AppResult<()> {
        let current = self
            .store
            .incr_with_ttl(&format!("rate:ip:{ip}"), self.window)
            .await?;

        if current > self.max_per_ip {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}
