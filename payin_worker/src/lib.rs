//! # Pay-in capture worker
//! This crate hosts the deployable worker process for the pay-in engine. It is responsible for:
//! Discovering payment intents that are due for capture and driving them through the capture protocol.
//! Re-arming intents whose workers died mid-capture.
//! Talking to the external payment provider over HTTP.
//!
//! ## Configuration
//! The worker is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod stripe;
pub mod worker;
