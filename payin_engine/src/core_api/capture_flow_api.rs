use std::fmt::Debug;

use chrono::Utc;
use log::*;
use thiserror::Error;

use crate::{
    db_types::{ChargeReceipt, IntentId, IntentStatus, PaymentIntent},
    events::{CaptureCompletedEvent, CaptureFailedEvent, EventProducers},
    helpers::retry::{retry_with_backoff, RetryPolicy},
    traits::{
        AmbiguousFailure,
        CaptureRequest,
        CaptureResponse,
        Decline,
        IntentStoreError,
        PaymentIntentStore,
        PaymentProviderGateway,
        StatusChange,
    },
};

/// The terminal classification of one `capture` call, from the caller's point of view.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Funds are captured and the receipt is on file.
    Captured(ChargeReceipt),
    /// Another worker holds (or already finished) this intent; nothing was done. A successful no-op.
    AlreadyClaimed,
    /// The provider rejected the capture; the intent is now `CaptureFailed`.
    Declined(Decline),
    /// The remote call ended without a definite answer. The intent stays `Capturing` until the recovery pass
    /// re-arms it.
    Pending(AmbiguousFailure),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Intent store failure: {0}")]
    Store(#[from] IntentStoreError),
    /// Funds moved at the provider but the local record could not be updated within the retry budget. The one
    /// condition this subsystem must never swallow.
    #[error(
        "Funds for intent {intent_id} were captured remotely, but the local record could not be updated after \
         {attempts} attempts: {source}"
    )]
    LedgerDrift {
        intent_id: IntentId,
        attempts: u32,
        source: IntentStoreError,
    },
}

/// Drives a single payment intent through the idempotent capture protocol.
///
/// The flow is: claim the intent via a conditional status update, short-circuit on any stored provider receipt,
/// otherwise call the provider, then finalise the local record. Every local mutation is guarded by the expected
/// previous status, which is what makes concurrent invocation safe.
pub struct CaptureFlowApi<S, G> {
    store: S,
    gateway: G,
    producers: EventProducers,
    retry: RetryPolicy,
}

impl<S, G> Debug for CaptureFlowApi<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CaptureFlowApi")
    }
}

impl<S, G> CaptureFlowApi<S, G> {
    pub fn new(store: S, gateway: G, producers: EventProducers) -> Self {
        Self { store, gateway, producers, retry: RetryPolicy::default() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl<S, G> CaptureFlowApi<S, G>
where
    S: PaymentIntentStore,
    G: PaymentProviderGateway,
{
    /// Captures `intent`, reporting its terminal local classification.
    ///
    /// Callers pass the snapshot they read; the claim step re-validates it against the store, so a stale snapshot
    /// degrades to a no-op rather than a double capture.
    pub async fn capture(&self, intent: &PaymentIntent) -> Result<CaptureOutcome, CaptureError> {
        if intent.status != IntentStatus::RequiresCapture {
            debug!("💳️ Intent {} is {}; nothing to capture", intent.id, intent.status);
            return Ok(CaptureOutcome::AlreadyClaimed);
        }
        let claimed = self
            .store
            .conditional_update_status(
                &intent.id,
                IntentStatus::RequiresCapture,
                IntentStatus::Capturing,
                StatusChange::none(),
            )
            .await?;
        if !claimed {
            debug!("💳️ Intent {} was claimed by another worker; backing off", intent.id);
            return Ok(CaptureOutcome::AlreadyClaimed);
        }

        let receipt = match self.store.get_receipt(&intent.idempotency_key).await? {
            Some(receipt) => {
                debug!(
                    "💳️ Intent {} already has provider receipt {}; skipping the remote call",
                    intent.id, receipt.provider_charge_id
                );
                receipt
            },
            None => match self.gateway.capture(CaptureRequest::for_intent(intent)).await {
                CaptureResponse::Captured(receipt) => {
                    self.record_receipt(intent, &receipt).await?;
                    receipt
                },
                CaptureResponse::Declined(decline) => return self.mark_declined(intent, decline).await,
                CaptureResponse::Ambiguous(failure) => {
                    warn!(
                        "💳️ Capture of intent {} ended ambiguously ({failure}). Leaving it in Capturing for the \
                         recovery pass",
                        intent.id
                    );
                    return Ok(CaptureOutcome::Pending(failure));
                },
            },
        };
        self.finalize(intent, receipt).await
    }

    async fn mark_declined(&self, intent: &PaymentIntent, decline: Decline) -> Result<CaptureOutcome, CaptureError> {
        let updated = self
            .store
            .conditional_update_status(
                &intent.id,
                IntentStatus::Capturing,
                IntentStatus::CaptureFailed,
                StatusChange::none(),
            )
            .await?;
        if !updated {
            warn!("💳️ Intent {} left Capturing before its decline could be recorded", intent.id);
        }
        warn!("💳️ Provider declined capture of intent {}: {decline}", intent.id);
        self.publish_capture_failed(intent, &decline).await;
        Ok(CaptureOutcome::Declined(decline))
    }

    /// Persists the receipt for a confirmed remote capture. From this point on the money has moved, so failures are
    /// retried and then escalated rather than returned as ordinary errors.
    async fn record_receipt(&self, intent: &PaymentIntent, receipt: &ChargeReceipt) -> Result<(), CaptureError> {
        let store = &self.store;
        retry_with_backoff(self.retry, "save_receipt", || store.save_receipt(receipt))
            .await
            .map_err(|e| self.ledger_drift(intent, e))
    }

    async fn finalize(&self, intent: &PaymentIntent, receipt: ChargeReceipt) -> Result<CaptureOutcome, CaptureError> {
        let change = StatusChange::captured(receipt.amount, Utc::now());
        let store = &self.store;
        let id = &intent.id;
        let updated = retry_with_backoff(self.retry, "finalize_capture", || {
            store.conditional_update_status(id, IntentStatus::Capturing, IntentStatus::Captured, change.clone())
        })
        .await
        .map_err(|e| self.ledger_drift(intent, e))?;
        if updated {
            info!("💳️ Intent {} captured for {} {}", intent.id, receipt.amount, receipt.currency);
        } else {
            // A racing recovery pass re-armed the intent while the remote call was in flight. The stored receipt
            // guarantees the next attempt short-circuits straight back to this point without touching the provider.
            warn!("💳️ Intent {} was re-armed mid-capture; its receipt will settle it on the next pass", intent.id);
        }
        self.publish_capture_completed(intent, &receipt).await;
        Ok(CaptureOutcome::Captured(receipt))
    }

    fn ledger_drift(&self, intent: &PaymentIntent, source: IntentStoreError) -> CaptureError {
        error!(
            "🚨️ Funds for intent {} have moved at the provider, but the local ledger could not be updated. Manual \
             reconciliation required.",
            intent.id
        );
        CaptureError::LedgerDrift { intent_id: intent.id.clone(), attempts: self.retry.attempts, source }
    }

    async fn publish_capture_completed(&self, intent: &PaymentIntent, receipt: &ChargeReceipt) {
        for emitter in &self.producers.capture_completed_producer {
            let event = CaptureCompletedEvent::new(intent.clone(), receipt.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn publish_capture_failed(&self, intent: &PaymentIntent, decline: &Decline) {
        for emitter in &self.producers.capture_failed_producer {
            let event = CaptureFailedEvent::new(intent.clone(), decline.clone());
            emitter.publish_event(event).await;
        }
    }
}
