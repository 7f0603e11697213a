use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payin_common::Money;
use thiserror::Error;

use crate::db_types::{ChargeReceipt, IntentId, IntentStatus, NewPaymentIntent, PaymentIntent};

/// Extra columns written together with a conditional status transition.
///
/// `None` fields leave the stored value untouched, so a plain claim or reset can share the same store operation as
/// the finalising `Captured` transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusChange {
    pub amount_captured: Option<Money>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn captured(amount: Money, at: DateTime<Utc>) -> Self {
        Self { amount_captured: Some(amount), captured_at: Some(at) }
    }
}

/// Keyset cursor for paging through due intents in `(capture_after, id)` order.
///
/// Keyset rather than OFFSET paging, so rows cannot be skipped when statuses flip while a scan is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueCursor {
    pub capture_after: DateTime<Utc>,
    pub id: IntentId,
}

impl DueCursor {
    /// The cursor that resumes a scan immediately after `intent`.
    pub fn after(intent: &PaymentIntent) -> Self {
        Self { capture_after: intent.capture_after, id: intent.id.clone() }
    }
}

#[derive(Debug, Clone, Error)]
pub enum IntentStoreError {
    #[error("The intent store backend failed: {0}")]
    DatabaseError(String),
    #[error("Cannot insert intent, since it already exists with id {0}")]
    DuplicateIntent(IntentId),
    #[error("Cannot insert intent, since idempotency key {0} is already in use")]
    DuplicateIdempotencyKey(String),
    #[error("The requested payment intent {0} does not exist")]
    IntentNotFound(IntentId),
}

impl From<sqlx::Error> for IntentStoreError {
    fn from(e: sqlx::Error) -> Self {
        IntentStoreError::DatabaseError(e.to_string())
    }
}

/// The transactional store holding payment intents and their provider receipts.
///
/// All status mutations go through [`conditional_update_status`](PaymentIntentStore::conditional_update_status), the
/// optimistic-concurrency guard that serialises workers racing for the same intent.
#[async_trait]
pub trait PaymentIntentStore: Clone + Send + Sync {
    /// Stores a brand-new intent. Fails if the id or the idempotency key is already taken.
    async fn insert_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, IntentStoreError>;

    async fn fetch_intent(&self, id: &IntentId) -> Result<Option<PaymentIntent>, IntentStoreError>;

    /// One page of intents in `RequiresCapture` whose `capture_after` is at or before `as_of`, ordered by
    /// `(capture_after, id)` ascending. Returns at most `limit` rows; pass the last row back as the cursor to
    /// continue. Each invocation restarts from the given cursor, so a scan never materialises the whole backlog.
    async fn find_due_for_capture(
        &self,
        as_of: DateTime<Utc>,
        cursor: Option<DueCursor>,
        limit: usize,
    ) -> Result<Vec<PaymentIntent>, IntentStoreError>;

    /// Intents sitting in `Capturing` whose `updated_at` is older than `older_than` — the signature of a worker that
    /// died or a remote call that never resolved.
    async fn find_stale_in_progress(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>, IntentStoreError>;

    /// Transitions `id` from `expected` to `new_status` and applies `change`, bumping `updated_at`.
    ///
    /// Returns `true` iff a row matched and was updated. A `false` return is not an error: it means another worker
    /// got there first, and callers treat it as a successful no-op.
    async fn conditional_update_status(
        &self,
        id: &IntentId,
        expected: IntentStatus,
        new_status: IntentStatus,
        change: StatusChange,
    ) -> Result<bool, IntentStoreError>;

    async fn get_receipt(&self, idempotency_key: &str) -> Result<Option<ChargeReceipt>, IntentStoreError>;

    /// Stores a receipt. Idempotent: saving the same key twice is a no-op.
    async fn save_receipt(&self, receipt: &ChargeReceipt) -> Result<(), IntentStoreError>;
}
