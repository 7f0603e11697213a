use std::fmt::Display;

use async_trait::async_trait;
use payin_common::Money;
use thiserror::Error;

use crate::db_types::{ChargeReceipt, IntentId, PaymentIntent};

//--------------------------------------    CaptureRequest     -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub intent_id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub idempotency_key: String,
}

impl CaptureRequest {
    pub fn for_intent(intent: &PaymentIntent) -> Self {
        Self {
            intent_id: intent.id.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            idempotency_key: intent.idempotency_key.clone(),
        }
    }
}

//--------------------------------------      DeclineCode      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineCode {
    CardDeclined,
    InsufficientFunds,
    AuthorizationExpired,
    /// The intent is not in a capturable state on the provider side.
    InvalidState,
    Other,
}

impl DeclineCode {
    /// Maps a provider error code string onto the local taxonomy. Unknown codes land in `Other` so that new provider
    /// codes degrade to a classified decline rather than an ambiguous outcome.
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "card_declined" => Self::CardDeclined,
            "insufficient_funds" => Self::InsufficientFunds,
            "expired_card" | "authorization_expired" => Self::AuthorizationExpired,
            "payment_intent_unexpected_state" | "charge_already_captured" | "charge_already_refunded" => {
                Self::InvalidState
            },
            _ => Self::Other,
        }
    }
}

impl Display for DeclineCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineCode::CardDeclined => write!(f, "card_declined"),
            DeclineCode::InsufficientFunds => write!(f, "insufficient_funds"),
            DeclineCode::AuthorizationExpired => write!(f, "authorization_expired"),
            DeclineCode::InvalidState => write!(f, "invalid_state"),
            DeclineCode::Other => write!(f, "other"),
        }
    }
}

//--------------------------------------        Decline        -------------------------------------------------------
/// A classified rejection from the provider. Terminal for the intent; retrying will not change the answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The provider declined the capture ({code}): {message}")]
pub struct Decline {
    pub code: DeclineCode,
    pub message: String,
}

impl Decline {
    pub fn new<S: Into<String>>(code: DeclineCode, message: S) -> Self {
        Self { code, message: message.into() }
    }
}

//--------------------------------------   AmbiguousFailure    -------------------------------------------------------
/// A capture call that ended without a definite answer. The charge may or may not have gone through, so the caller
/// must leave the intent in `Capturing` and let staleness recovery re-arm it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmbiguousFailure {
    #[error("The capture call timed out after {0}ms")]
    Timeout(u64),
    #[error("Transport failure before a response arrived: {0}")]
    Transport(String),
    #[error("The provider returned a server error (HTTP {0})")]
    ServerError(u16),
}

//--------------------------------------   CaptureResponse     -------------------------------------------------------
/// The three-way outcome of a remote capture call.
///
/// Deliberately not a `Result`: collapsing the ambiguous arm into an error would invite callers to treat it as a
/// failure, which is exactly the mistake this type exists to prevent.
#[derive(Debug, Clone)]
pub enum CaptureResponse {
    Captured(ChargeReceipt),
    Declined(Decline),
    Ambiguous(AmbiguousFailure),
}

//--------------------------------------   ProviderBalance     -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBalance {
    pub available: Money,
    pub pending: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The provider rejected the request: {0}")]
    Rejected(String),
    #[error("The provider could not be reached: {0}")]
    Unavailable(String),
}

//-------------------------------------- PaymentProviderGateway ------------------------------------------------------
/// The remote payment provider, reduced to the operations the engine consumes.
///
/// The provider is assumed to enforce its own at-most-once guarantee keyed by the supplied idempotency key; the
/// engine never assumes exclusive access and always checks for an existing receipt before calling out.
#[async_trait]
pub trait PaymentProviderGateway: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> CaptureResponse;

    /// Account balance at the provider. Used as a cheap connectivity probe and by payout reporting.
    async fn balance(&self) -> Result<ProviderBalance, GatewayError>;
}
