//! Periodic partner sync.
//!
//! One tokio task runs a pass right after `start` and then once per interval.
//! A pass lists every partner account and asks the [`SyncService`] to sync
//! each of them. Failures are logged and counted; nothing is retried until
//! the next pass.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    app_error::{AppError, AppResult},
    use_cases::{ledger::PartnerAccountRepo, sync::SyncService},
};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Counts of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub accounts: usize,
    pub accounts_failed: usize,
    pub apps_synced: usize,
    pub apps_failed: usize,
    /// Listing partner accounts failed, so nothing was synced.
    pub account_listing_failed: bool,
}

#[derive(Clone)]
struct PassRunner {
    accounts: Arc<dyn PartnerAccountRepo>,
    sync: Arc<dyn SyncService>,
    in_flight: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
}

/// Decrements the in-flight count even when the pass future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PassRunner {
    async fn run_pass(&self) -> PassReport {
        let _in_flight = InFlight::enter(&self.in_flight);
        let mut report = PassReport::default();

        let account_ids = match self.accounts.get_all_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to list partner accounts");
                report.account_listing_failed = true;
                return report;
            }
        };
        report.accounts = account_ids.len();

        for account_id in account_ids {
            let results = match self.sync.sync_all_apps(account_id).await {
                Ok(results) => results,
                Err(e) => {
                    error!(partner_account_id = %account_id, error = %e, "Partner account sync failed");
                    report.accounts_failed += 1;
                    continue;
                }
            };

            for result in results {
                match &result.error {
                    Some(e) => {
                        warn!(
                            partner_account_id = %account_id,
                            app_id = %result.app_id,
                            app = %result.app_name,
                            error = %e,
                            "App sync failed"
                        );
                        report.apps_failed += 1;
                    }
                    None => report.apps_synced += 1,
                }
            }
        }
        report
    }
}

struct Worker {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct SyncScheduler {
    runner: PassRunner,
    interval: Duration,
    worker: Mutex<Option<Worker>>,
}

impl SyncScheduler {
    pub fn new(accounts: Arc<dyn PartnerAccountRepo>, sync: Arc<dyn SyncService>) -> Self {
        Self {
            runner: PassRunner {
                accounts,
                sync,
                in_flight: Arc::new(AtomicUsize::new(0)),
                stopped: Arc::new(AtomicBool::new(false)),
            },
            interval: DEFAULT_SYNC_INTERVAL,
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Only valid before [`SyncScheduler::start`].
    pub fn set_interval(&mut self, interval: Duration) -> AppResult<()> {
        if interval.is_zero() {
            return Err(AppError::InvalidInput(
                "sync interval must be positive".into(),
            ));
        }
        if self.worker.get_mut().is_some() || self.runner.stopped.load(Ordering::SeqCst) {
            return Err(AppError::InvalidInput(
                "sync interval cannot change after start".into(),
            ));
        }
        self.interval = interval;
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        if self.runner.stopped.load(Ordering::SeqCst) {
            SchedulerState::Stopped
        } else if self.runner.in_flight.load(Ordering::SeqCst) > 0 {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub async fn start(&self) -> AppResult<()> {
        self.start_with_cancel(CancellationToken::new()).await
    }

    /// Start the loop. Cancelling `cancel` ends it without waiting for the
    /// pass in flight.
    pub async fn start_with_cancel(&self, cancel: CancellationToken) -> AppResult<()> {
        let mut worker = self.worker.lock().await;
        if self.runner.stopped.load(Ordering::SeqCst) {
            return Err(AppError::InvalidInput("sync scheduler is stopped".into()));
        }
        if worker.is_some() {
            return Err(AppError::InvalidInput(
                "sync scheduler already started".into(),
            ));
        }

        let stop = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.runner.clone(),
            self.interval,
            stop.clone(),
            cancel,
        ));
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Signal the loop and wait for it to exit, including any pass in flight.
    /// The scheduler cannot be restarted afterwards.
    pub async fn stop(&self) {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.stop.cancel();
            if let Err(e) = worker.handle.await {
                error!(error = %e, "Sync scheduler task panicked");
            }
        }
        self.runner.stopped.store(true, Ordering::SeqCst);
    }

    /// One pass on the caller's task, without starting the loop.
    pub async fn run_once(&self) -> PassReport {
        self.runner.run_pass().await
    }
}

async fn run_loop(
    runner: PassRunner,
    every: Duration,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = every.as_secs(), "Sync scheduler started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!("Sync pass aborted by cancellation");
                        break;
                    }
                    report = runner.run_pass() => {
                        info!(
                            accounts = report.accounts,
                            accounts_failed = report.accounts_failed,
                            apps_synced = report.apps_synced,
                            apps_failed = report.apps_failed,
                            "Sync pass finished"
                        );
                    }
                }
            }
        }
    }

    runner.stopped.store(true, Ordering::SeqCst);
    info!("Sync scheduler stopped");
}
