use std::sync::Arc;

use chrono::{Duration, Utc};
use log::*;
use thiserror::Error;

use crate::{
    core_api::CaptureFlowApi,
    db_types::{IntentId, IntentStatus, PaymentIntent},
    jobs::pool::{JobError, JobOutcome, JobPool, PoolError},
    traits::{DueCursor, IntentStoreError, PaymentIntentStore, PaymentProviderGateway, StatusChange},
};

/// How many due intents a single store query may return.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// How long an intent may sit in `Capturing` before the recovery pass assumes its worker died.
pub const DEFAULT_STALE_AFTER: Duration = Duration::hours(1);

#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("Intent store failure during a scheduler pass: {0}")]
    Store(#[from] IntentStoreError),
    #[error("{0}")]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub dispatched: usize,
}

/// One unit of capture work: an intent snapshot plus a handle to the shared capture flow.
pub struct CaptureTask<S: PaymentIntentStore, G: PaymentProviderGateway> {
    intent: PaymentIntent,
    api: Arc<CaptureFlowApi<S, G>>,
}

impl<S, G> CaptureTask<S, G>
where
    S: PaymentIntentStore,
    G: PaymentProviderGateway,
{
    pub fn new(intent: PaymentIntent, api: Arc<CaptureFlowApi<S, G>>) -> Self {
        Self { intent, api }
    }

    pub fn intent_id(&self) -> IntentId {
        self.intent.id.clone()
    }

    pub async fn run(self) -> Result<(), JobError> {
        match self.api.capture(&self.intent).await {
            Ok(_) => Ok(()),
            Err(e) => Err(JobError::Failed(e.to_string())),
        }
    }
}

/// The two periodic control loops of capture reconciliation, exposed as idempotent passes.
///
/// Both passes only mutate state through conditional updates, so running either pass concurrently with itself, the
/// other pass, or another process instance is safe.
pub struct CaptureScheduler<S: PaymentIntentStore, G: PaymentProviderGateway> {
    store: S,
    api: Arc<CaptureFlowApi<S, G>>,
    pool: Arc<JobPool>,
    page_size: usize,
    stale_after: Duration,
}

impl<S, G> CaptureScheduler<S, G>
where
    S: PaymentIntentStore + 'static,
    G: PaymentProviderGateway + 'static,
{
    pub fn new(store: S, api: Arc<CaptureFlowApi<S, G>>, pool: Arc<JobPool>) -> Self {
        Self { store, api, pool, page_size: DEFAULT_PAGE_SIZE, stale_after: DEFAULT_STALE_AFTER }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Finds every intent due for capture and dispatches a [`CaptureTask`] for each through the pool.
    ///
    /// The scan pages through the backlog with a keyset cursor, oldest due time first, so the worst-case staleness
    /// of any one intent is bounded and the backlog never materialises in memory at once.
    pub async fn discovery_pass(&self) -> Result<DispatchSummary, SchedulerError> {
        let as_of = Utc::now();
        let mut summary = DispatchSummary::default();
        let mut cursor: Option<DueCursor> = None;
        loop {
            let batch = self.store.find_due_for_capture(as_of, cursor.clone(), self.page_size).await?;
            if batch.is_empty() {
                break;
            }
            summary.pages += 1;
            let full_page = batch.len() == self.page_size;
            cursor = batch.last().map(DueCursor::after);
            for intent in batch {
                let task = CaptureTask::new(intent, Arc::clone(&self.api));
                let id = task.intent_id();
                self.pool.spawn(task.run(), move |outcome| log_job_outcome("capture", &id, &outcome)).await?;
                summary.dispatched += 1;
            }
            if !full_page {
                break;
            }
        }
        debug!("📅️ Discovery pass dispatched {} capture job(s) over {} page(s)", summary.dispatched, summary.pages);
        Ok(summary)
    }

    /// Re-arms intents stuck in `Capturing` past the staleness threshold by resetting them to `RequiresCapture`.
    ///
    /// Safe precisely because the capture protocol is idempotent: a re-armed intent that actually completed remotely
    /// will short-circuit on its stored receipt instead of charging the payer again. The reset itself is guarded by
    /// the expected previous status, so a worker that finishes mid-reset is not clobbered.
    pub async fn recovery_pass(&self) -> Result<RecoveryStats, SchedulerError> {
        let cutoff = Utc::now() - self.stale_after;
        let stale = self.store.find_stale_in_progress(cutoff).await?;
        if stale.is_empty() {
            debug!("🔁️ No stuck captures found");
            return Ok(RecoveryStats::default());
        }
        info!("🔁️ Re-arming {} capture(s) untouched since before {cutoff}", stale.len());
        let mut stats = RecoveryStats::default();
        for intent in stale {
            let store = self.store.clone();
            let id = intent.id.clone();
            let callback_id = intent.id.clone();
            self.pool
                .spawn(
                    async move {
                        let reset = store
                            .conditional_update_status(
                                &id,
                                IntentStatus::Capturing,
                                IntentStatus::RequiresCapture,
                                StatusChange::none(),
                            )
                            .await
                            .map_err(|e| JobError::Failed(e.to_string()))?;
                        if reset {
                            info!("🔁️ Intent {id} re-armed for capture");
                        } else {
                            debug!("🔁️ Intent {id} settled on its own before the reset landed");
                        }
                        Ok(())
                    },
                    move |outcome| log_job_outcome("recovery", &callback_id, &outcome),
                )
                .await?;
            stats.dispatched += 1;
        }
        Ok(stats)
    }
}

/// The per-intent completion log. This is the pool's observability surface; job errors never propagate past it.
fn log_job_outcome(kind: &str, id: &IntentId, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Success => debug!("📅️ {kind} job for intent {id} completed"),
        JobOutcome::Failed(e) => error!("📅️ {kind} job for intent {id} failed: {e}"),
        JobOutcome::Cancelled => warn!("📅️ {kind} job for intent {id} was cancelled at shutdown"),
    }
}
