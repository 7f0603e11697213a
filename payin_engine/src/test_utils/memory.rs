use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payin_common::Money;

use crate::{
    db_types::{ChargeReceipt, IntentId, IntentStatus, NewPaymentIntent, PaymentIntent},
    helpers::new_charge_id,
    traits::{
        CaptureRequest,
        CaptureResponse,
        DueCursor,
        GatewayError,
        IntentStoreError,
        PaymentIntentStore,
        PaymentProviderGateway,
        ProviderBalance,
        StatusChange,
    },
};

/// An in-memory [`PaymentIntentStore`] with the same conditional-update semantics as the SQLite backend.
///
/// The single mutex makes every operation atomic, which is exactly what the concurrency tests need: races are
/// decided by lock order, never by torn state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    receipt_faults: Arc<AtomicU32>,
}

#[derive(Default)]
struct Inner {
    intents: HashMap<IntentId, PaymentIntent>,
    receipts: HashMap<String, ChargeReceipt>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert that panics on duplicates, for terser test setup.
    pub async fn insert(&self, intent: NewPaymentIntent) -> PaymentIntent {
        self.insert_intent(intent).await.expect("duplicate intent in test setup")
    }

    /// Makes the next `n` receipt saves fail, simulating a store that goes down right after the remote capture
    /// succeeded.
    pub fn fail_next_receipt_saves(&self, n: u32) {
        self.receipt_faults.store(n, Ordering::SeqCst);
    }

    /// Forces an intent into `status` with the given `updated_at`, bypassing the conditional-update guard. For
    /// staging stuck-worker scenarios only.
    pub fn force_status(&self, id: &IntentId, status: IntentStatus, updated_at: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        let intent = inner.intents.get_mut(id).expect("unknown intent in test setup");
        intent.status = status;
        intent.updated_at = updated_at;
    }

    fn take_receipt_fault(&self) -> bool {
        self.receipt_faults.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

#[async_trait]
impl PaymentIntentStore for MemoryStore {
    async fn insert_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, IntentStoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.intents.contains_key(&intent.id) {
            return Err(IntentStoreError::DuplicateIntent(intent.id));
        }
        if inner.intents.values().any(|i| i.idempotency_key == intent.idempotency_key) {
            return Err(IntentStoreError::DuplicateIdempotencyKey(intent.idempotency_key));
        }
        let now = Utc::now();
        let record = PaymentIntent {
            id: intent.id.clone(),
            amount: intent.amount,
            currency: intent.currency,
            status: IntentStatus::RequiresCapture,
            capture_method: intent.capture_method,
            idempotency_key: intent.idempotency_key,
            capture_after: intent.capture_after,
            amount_captured: None,
            captured_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.intents.insert(intent.id, record.clone());
        Ok(record)
    }

    async fn fetch_intent(&self, id: &IntentId) -> Result<Option<PaymentIntent>, IntentStoreError> {
        Ok(self.inner.lock().unwrap().intents.get(id).cloned())
    }

    async fn find_due_for_capture(
        &self,
        as_of: DateTime<Utc>,
        cursor: Option<DueCursor>,
        limit: usize,
    ) -> Result<Vec<PaymentIntent>, IntentStoreError> {
        let inner = self.inner.lock().unwrap();
        let mut due: Vec<PaymentIntent> = inner
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::RequiresCapture && i.capture_after <= as_of)
            .filter(|i| cursor.as_ref().map(|c| (i.capture_after, &i.id) > (c.capture_after, &c.id)).unwrap_or(true))
            .cloned()
            .collect();
        due.sort_by(|a, b| (a.capture_after, &a.id).cmp(&(b.capture_after, &b.id)));
        due.truncate(limit);
        Ok(due)
    }

    async fn find_stale_in_progress(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>, IntentStoreError> {
        let inner = self.inner.lock().unwrap();
        let mut stale: Vec<PaymentIntent> = inner
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::Capturing && i.updated_at < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|i| i.updated_at);
        Ok(stale)
    }

    async fn conditional_update_status(
        &self,
        id: &IntentId,
        expected: IntentStatus,
        new_status: IntentStatus,
        change: StatusChange,
    ) -> Result<bool, IntentStoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.intents.get_mut(id) {
            Some(intent) if intent.status == expected => {
                intent.status = new_status;
                intent.updated_at = Utc::now();
                if let Some(amount) = change.amount_captured {
                    intent.amount_captured = Some(amount);
                }
                if let Some(at) = change.captured_at {
                    intent.captured_at = Some(at);
                }
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn get_receipt(&self, idempotency_key: &str) -> Result<Option<ChargeReceipt>, IntentStoreError> {
        Ok(self.inner.lock().unwrap().receipts.get(idempotency_key).cloned())
    }

    async fn save_receipt(&self, receipt: &ChargeReceipt) -> Result<(), IntentStoreError> {
        if self.take_receipt_fault() {
            return Err(IntentStoreError::DatabaseError("injected receipt-save failure".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.receipts.entry(receipt.idempotency_key.clone()).or_insert_with(|| receipt.clone());
        Ok(())
    }
}

/// A scripted provider double. Responses are consumed front-to-back; once the script is exhausted, every capture
/// succeeds with a fresh receipt. Capture calls are recorded in order for assertions.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<VecDeque<CaptureResponse>>>,
    calls: Arc<Mutex<Vec<IntentId>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, response: CaptureResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn capture_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_order(&self) -> Vec<IntentId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProviderGateway for ScriptedGateway {
    async fn capture(&self, request: CaptureRequest) -> CaptureResponse {
        self.calls.lock().unwrap().push(request.intent_id.clone());
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            CaptureResponse::Captured(ChargeReceipt::new(
                request.idempotency_key.clone(),
                request.intent_id.clone(),
                new_charge_id(),
                request.amount,
                request.currency.clone(),
            ))
        })
    }

    async fn balance(&self) -> Result<ProviderBalance, GatewayError> {
        Ok(ProviderBalance { available: Money::from(0), pending: Money::from(0), currency: "usd".to_string() })
    }
}
