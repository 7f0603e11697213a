use crate::{
    db_types::{ChargeReceipt, PaymentIntent},
    traits::Decline,
};

/// Emitted once a capture has been confirmed at the provider. The local record may still be converging (see the
/// capture flow's finalise step), but the money has moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCompletedEvent {
    pub intent: PaymentIntent,
    pub receipt: ChargeReceipt,
}

impl CaptureCompletedEvent {
    pub fn new(intent: PaymentIntent, receipt: ChargeReceipt) -> Self {
        Self { intent, receipt }
    }
}

/// Emitted when the provider returns a classified decline and the intent is marked `CaptureFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailedEvent {
    pub intent: PaymentIntent,
    pub decline: Decline,
}

impl CaptureFailedEvent {
    pub fn new(intent: PaymentIntent, decline: Decline) -> Self {
        Self { intent, decline }
    }
}
