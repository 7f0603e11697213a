//! The engine's public-facing APIs: the capture flow itself, plus the payout-account and dispute query layers.
mod capture_flow_api;
mod disputes_api;
mod payout_accounts_api;

pub use capture_flow_api::{CaptureError, CaptureFlowApi, CaptureOutcome};
pub use disputes_api::DisputeApi;
pub use payout_accounts_api::PayoutAccountApi;
