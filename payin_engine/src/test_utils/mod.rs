//! Helpers for exercising the engine in tests: an in-memory store, a scripted provider gateway, and environment
//! preparation utilities.
mod memory;

#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub use memory::{MemoryStore, ScriptedGateway};

/// Initialise logging for a test run. Safe to call from every test; only the first call wins.
pub fn init_test_logging() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
}
