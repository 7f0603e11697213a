use payin_engine::traits::IntentStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not initialize the worker. {0}")]
    InitializeError(String),
    #[error("An error occurred in the intent store. {0}")]
    BackendError(#[from] IntentStoreError),
    #[error("An I/O error happened in the worker. {0}")]
    IOError(#[from] std::io::Error),
}
