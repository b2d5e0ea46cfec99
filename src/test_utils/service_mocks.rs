//! In-memory metrics cache and a scriptable sync service.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        metrics::{AppMetrics, MetricsCache},
        sync::{AppSyncResult, SyncService},
    },
};

// ============================================================================
// InMemoryMetricsCache
// ============================================================================

#[derive(Default)]
pub struct InMemoryMetricsCache {
    pub entries: Mutex<HashMap<Uuid, AppMetrics>>,
    fail: AtomicBool,
}

impl InMemoryMetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation return a cache error.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, app_id: Uuid) -> bool {
        self.entries.lock().unwrap().contains_key(&app_id)
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Cache("cache unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsCache for InMemoryMetricsCache {
    async fn get(&self, app_id: Uuid) -> AppResult<Option<AppMetrics>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(&app_id).cloned())
    }

    async fn put(&self, metrics: &AppMetrics) -> AppResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(metrics.app_id, metrics.clone());
        Ok(())
    }

    async fn invalidate(&self, app_id: Uuid) -> AppResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(&app_id);
        Ok(())
    }
}

// ============================================================================
// MockSyncService
// ============================================================================

/// Answers `sync_all_apps` from per-account scripts.
///
/// Each account maps to the success flag of each of its apps. Unknown
/// accounts have no apps.
#[derive(Default)]
pub struct MockSyncService {
    pub outcomes: Mutex<HashMap<Uuid, Vec<bool>>>,
    pub failing_accounts: Mutex<HashSet<Uuid>>,
    pub delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
    /// Calls that ran to completion.
    pub completed: AtomicUsize,
    /// Signalled at the start of every call.
    pub called: Notify,
}

impl MockSyncService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account_id: Uuid, app_outcomes: &[bool]) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(account_id, app_outcomes.to_vec());
        self
    }

    pub fn fail_account(self, account_id: Uuid) -> Self {
        self.failing_accounts.lock().unwrap().insert(account_id);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncService for MockSyncService {
    async fn sync_all_apps(&self, partner_account_id: Uuid) -> AppResult<Vec<AppSyncResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self
            .failing_accounts
            .lock()
            .unwrap()
            .contains(&partner_account_id)
        {
            return Err(AppError::Sync("partner API unavailable".into()));
        }

        let outcomes = self
            .outcomes
            .lock()
            .unwrap()
            .get(&partner_account_id)
            .cloned()
            .unwrap_or_default();

        Ok(outcomes
            .into_iter()
            .enumerate()
            .map(|(i, ok)| AppSyncResult {
                app_id: Uuid::new_v4(),
                app_name: format!("App {i}"),
                transaction_count: if ok { 1 } else { 0 },
                error: (!ok).then(|| AppError::Sync("app sync failed".into())),
            })
            .collect())
    }
}
