use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use payin_common::{Money, DEFAULT_CURRENCY};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::{new_idempotency_key, new_intent_id};

/// The statement descriptor applied to payout accounts that do not supply their own.
pub const DEFAULT_STATEMENT_DESCRIPTOR: &str = "MARKETPLACE PAYOUT";

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------       IntentId        -------------------------------------------------------
/// Opaque unique identifier for a payment intent. In practice these are `pi_`-prefixed tokens minted at
/// authorization time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct IntentId(pub String);

impl FromStr for IntentId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for IntentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     IntentStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum IntentStatus {
    /// The intent has been authorized and is waiting for its capture window.
    RequiresCapture,
    /// A worker has claimed the intent and the capture protocol is in flight.
    Capturing,
    /// Funds have been captured and recorded locally. Terminal.
    Captured,
    /// The provider rejected the capture with a classified error. Terminal.
    CaptureFailed,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntentStatus::Captured | IntentStatus::CaptureFailed)
    }
}

impl Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentStatus::RequiresCapture => write!(f, "RequiresCapture"),
            IntentStatus::Capturing => write!(f, "Capturing"),
            IntentStatus::Captured => write!(f, "Captured"),
            IntentStatus::CaptureFailed => write!(f, "CaptureFailed"),
        }
    }
}

impl FromStr for IntentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RequiresCapture" => Ok(Self::RequiresCapture),
            "Capturing" => Ok(Self::Capturing),
            "Captured" => Ok(Self::Captured),
            "CaptureFailed" => Ok(Self::CaptureFailed),
            s => Err(ConversionError(format!("Invalid intent status: {s}"))),
        }
    }
}

impl From<String> for IntentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid intent status: {value}. But this conversion cannot fail. Defaulting to RequiresCapture");
            IntentStatus::RequiresCapture
        })
    }
}

//--------------------------------------    CaptureMethod      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CaptureMethod {
    /// The provider captures as soon as the charge is authorized; reconciliation only records the result.
    Automatic,
    /// Capture is deferred until the marketplace confirms the cart, which is the flow this engine drives.
    Manual,
}

impl Display for CaptureMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMethod::Automatic => write!(f, "Automatic"),
            CaptureMethod::Manual => write!(f, "Manual"),
        }
    }
}

impl FromStr for CaptureMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Automatic" => Ok(Self::Automatic),
            "Manual" => Ok(Self::Manual),
            s => Err(ConversionError(format!("Invalid capture method: {s}"))),
        }
    }
}

//--------------------------------------    PaymentIntent      -------------------------------------------------------
/// An authorized-but-not-necessarily-captured charge against a payer.
///
/// The `status` column doubles as the mutual-exclusion mechanism for capture workers: every transition is a
/// conditional update against the previously observed status, so at most one non-terminal capture attempt can be
/// logically in flight per intent.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub status: IntentStatus,
    pub capture_method: CaptureMethod,
    /// Keys the provider-side receipt; the provider guarantees at-most-once effect per key.
    pub idempotency_key: String,
    /// The time from which the intent is due for capture.
    pub capture_after: DateTime<Utc>,
    pub amount_captured: Option<Money>,
    pub captured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   NewPaymentIntent    -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub capture_method: CaptureMethod,
    pub idempotency_key: String,
    pub capture_after: DateTime<Utc>,
}

impl NewPaymentIntent {
    /// A new manual-capture intent due immediately, with freshly minted id and idempotency key.
    pub fn new(amount: Money) -> Self {
        Self {
            id: new_intent_id(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            capture_method: CaptureMethod::Manual,
            idempotency_key: new_idempotency_key(),
            capture_after: Utc::now(),
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_capture_after(mut self, capture_after: DateTime<Utc>) -> Self {
        self.capture_after = capture_after;
        self
    }

    pub fn with_idempotency_key<S: Into<String>>(mut self, key: S) -> Self {
        self.idempotency_key = key.into();
        self
    }
}

//--------------------------------------    ChargeReceipt      -------------------------------------------------------
/// A provider-side receipt for a completed charge, stored locally so that retried captures can skip the remote call.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub idempotency_key: String,
    pub intent_id: IntentId,
    pub provider_charge_id: String,
    pub amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl ChargeReceipt {
    pub fn new<K, C, P>(idempotency_key: K, intent_id: IntentId, provider_charge_id: P, amount: Money, currency: C) -> Self
    where
        K: Into<String>,
        C: Into<String>,
        P: Into<String>,
    {
        Self {
            idempotency_key: idempotency_key.into(),
            intent_id,
            provider_charge_id: provider_charge_id.into(),
            amount,
            currency: currency.into(),
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------   PayoutEntityType    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutEntityType {
    Merchant,
    Courier,
}

impl Display for PayoutEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutEntityType::Merchant => write!(f, "Merchant"),
            PayoutEntityType::Courier => write!(f, "Courier"),
        }
    }
}

impl FromStr for PayoutEntityType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Merchant" => Ok(Self::Merchant),
            "Courier" => Ok(Self::Courier),
            s => Err(ConversionError(format!("Invalid payout entity type: {s}"))),
        }
    }
}

//--------------------------------------  VerificationStatus   -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Blocked,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Unverified => write!(f, "Unverified"),
            VerificationStatus::Pending => write!(f, "Pending"),
            VerificationStatus::Verified => write!(f, "Verified"),
            VerificationStatus::Blocked => write!(f, "Blocked"),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unverified" => Ok(Self::Unverified),
            "Pending" => Ok(Self::Pending),
            "Verified" => Ok(Self::Verified),
            "Blocked" => Ok(Self::Blocked),
            s => Err(ConversionError(format!("Invalid verification status: {s}"))),
        }
    }
}

//--------------------------------------    PayoutAccount      -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PayoutAccount {
    pub id: i64,
    pub entity: PayoutEntityType,
    /// The descriptor shown on the recipient's bank statement.
    pub statement_descriptor: String,
    pub verification_status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayoutAccount {
    pub entity: PayoutEntityType,
    pub statement_descriptor: String,
}

impl NewPayoutAccount {
    pub fn new(entity: PayoutEntityType) -> Self {
        Self { entity, statement_descriptor: DEFAULT_STATEMENT_DESCRIPTOR.to_string() }
    }

    pub fn with_statement_descriptor<S: Into<String>>(mut self, descriptor: S) -> Self {
        self.statement_descriptor = descriptor.into();
        self
    }
}

//--------------------------------------      DisputeId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct DisputeId(pub String);

impl From<String> for DisputeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DisputeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    DisputeStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DisputeStatus {
    NeedsResponse,
    UnderReview,
    Won,
    Lost,
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeStatus::NeedsResponse => write!(f, "NeedsResponse"),
            DisputeStatus::UnderReview => write!(f, "UnderReview"),
            DisputeStatus::Won => write!(f, "Won"),
            DisputeStatus::Lost => write!(f, "Lost"),
        }
    }
}

impl FromStr for DisputeStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NeedsResponse" => Ok(Self::NeedsResponse),
            "UnderReview" => Ok(Self::UnderReview),
            "Won" => Ok(Self::Won),
            "Lost" => Ok(Self::Lost),
            s => Err(ConversionError(format!("Invalid dispute status: {s}"))),
        }
    }
}

//--------------------------------------       Dispute         -------------------------------------------------------
/// A payer-initiated challenge against a captured charge, mirrored from the provider for lookup and reporting.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub intent_id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub status: DisputeStatus,
    pub reason: String,
    pub opened_at: DateTime<Utc>,
    pub evidence_due_by: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDispute {
    pub id: DisputeId,
    pub intent_id: IntentId,
    pub amount: Money,
    pub currency: String,
    pub reason: String,
    pub opened_at: DateTime<Utc>,
    pub evidence_due_by: Option<DateTime<Utc>>,
}

impl NewDispute {
    pub fn new<S: Into<String>>(id: DisputeId, intent_id: IntentId, amount: Money, reason: S) -> Self {
        Self {
            id,
            intent_id,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            reason: reason.into(),
            opened_at: Utc::now(),
            evidence_due_by: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in
            [IntentStatus::RequiresCapture, IntentStatus::Capturing, IntentStatus::Captured, IntentStatus::CaptureFailed]
        {
            assert_eq!(status.to_string().parse::<IntentStatus>().unwrap(), status);
        }
        assert_eq!(IntentStatus::from("Captured".to_string()), IntentStatus::Captured);
        assert!("Refunded".parse::<IntentStatus>().is_err());
        assert!(IntentStatus::Captured.is_terminal());
        assert!(IntentStatus::CaptureFailed.is_terminal());
        assert!(!IntentStatus::Capturing.is_terminal());
    }

    #[test]
    fn intents_serialize_for_the_wire() {
        let new_intent = NewPaymentIntent::new(Money::from(500));
        let intent = PaymentIntent {
            id: new_intent.id.clone(),
            amount: new_intent.amount,
            currency: new_intent.currency.clone(),
            status: IntentStatus::RequiresCapture,
            capture_method: new_intent.capture_method,
            idempotency_key: new_intent.idempotency_key.clone(),
            capture_after: new_intent.capture_after,
            amount_captured: None,
            captured_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["status"], "RequiresCapture");
        assert_eq!(json["capture_method"], "Manual");
        assert_eq!(json["amount"], 500);
        let back: PaymentIntent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }
}
