//! Marketplace Pay-In Engine
//!
//! This library contains the core logic for the marketplace's payment-processing backend. Money movement itself is
//! delegated to an external payment provider; what lives here is everything needed to reconcile the local ledger with
//! that provider, provider-agnostically.
//!
//! The library is divided into three main sections:
//! 1. Storage management and control ([`mod@traits`] and [`mod@sqlite`]). SQLite is the bundled backend. You should
//!    never need to touch the database directly. Instead, use the public APIs, which only speak to storage through the
//!    backend traits. The exception is the record types themselves, which are defined in [`mod@db_types`] and are
//!    public.
//! 2. The capture reconciliation pipeline ([`mod@jobs`] and [`CaptureFlowApi`]). A bounded job pool executes capture
//!    work discovered by the scheduler's periodic passes, driving each payment intent through an idempotent state
//!    machine that survives crashed workers and ambiguous provider outcomes.
//! 3. Payout-account and dispute management APIs ([`PayoutAccountApi`], [`DisputeApi`]), thin query/update layers over
//!    their backend traits.
//!
//! The engine also emits events when captures settle or fail. A simple hook system lets callers subscribe to these
//! events and perform custom actions, such as feeding a webhook dispatcher or an operator log.
pub mod core_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod jobs;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use core_api::{CaptureError, CaptureFlowApi, CaptureOutcome, DisputeApi, PayoutAccountApi};
pub use jobs::{CaptureScheduler, JobOutcome, JobPool};
pub use traits::{PaymentIntentStore, PaymentProviderGateway};
