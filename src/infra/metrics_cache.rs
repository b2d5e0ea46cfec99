use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use super::kv_store::KeyValueStore;
use crate::{
    app_error::{AppError, AppResult},
    use_cases::metrics::{AppMetrics, MetricsCache},
};

/// Stores [`AppMetrics`] as JSON with a fixed TTL.
pub struct KvMetricsCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl KvMetricsCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

fn key(app_id: Uuid) -> String {
    format!("metrics:app:{app_id}")
}

#[async_trait]
impl MetricsCache for KvMetricsCache {
    async fn get(&self, app_id: Uuid) -> AppResult<Option<AppMetrics>> {
        let Some(raw) = self.store.get(&key(app_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AppError::Cache(format!("undecodable metrics entry: {e}")))
    }

    async fn put(&self, metrics: &AppMetrics) -> AppResult<()> {
        let raw = serde_json::to_string(metrics).map_err(|e| AppError::Cache(e.to_string()))?;
        self.store.set_ex(&key(metrics.app_id), &raw, self.ttl).await
    }

    async fn invalidate(&self, app_id: Uuid) -> AppResult<()> {
        self.store.delete(&key(app_id)).await
    }
}
