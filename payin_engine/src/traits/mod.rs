//! Backend and collaborator contracts.
//!
//! This module defines the interface contracts between the pay-in engine and the two systems it cannot own: the
//! transactional store that holds payment-intent state, and the external payment provider that actually moves money.
//!
//! ## The store
//! [`PaymentIntentStore`] is the single source of truth for capture state. Every status mutation it exposes is a
//! conditional update guarded by an expected previous status; no caller ever performs a blind overwrite. That one
//! property is what makes it safe to run any number of scheduler passes and worker processes concurrently.
//!
//! ## The provider
//! [`PaymentProviderGateway`] wraps the remote capture call in a three-way outcome. Timeouts and transport failures
//! are their own arm, distinct from classified declines, because an ambiguous outcome must never be recorded as a
//! definite success or failure — the remote side may have completed the charge.
//!
//! ## Supporting records
//! [`PayoutAccountManagement`] and [`DisputeManagement`] cover the payout-account and dispute records the backend
//! keeps alongside cart payments.
mod dispute_management;
mod payment_intent_store;
mod payout_account_management;
mod provider_gateway;

pub use dispute_management::{DisputeApiError, DisputeManagement, DisputeQueryFilter};
pub use payment_intent_store::{DueCursor, IntentStoreError, PaymentIntentStore, StatusChange};
pub use payout_account_management::{PayoutAccountError, PayoutAccountManagement};
pub use provider_gateway::{
    AmbiguousFailure,
    CaptureRequest,
    CaptureResponse,
    Decline,
    DeclineCode,
    GatewayError,
    PaymentProviderGateway,
    ProviderBalance,
};
