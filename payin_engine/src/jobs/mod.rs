//! The background job machinery for capture reconciliation: a bounded pool that executes units of work, and the
//! scheduler passes that feed it.
mod pool;
mod scheduler;

pub use pool::{JobError, JobOutcome, JobPool, PoolError};
pub use scheduler::{
    CaptureScheduler,
    CaptureTask,
    DispatchSummary,
    RecoveryStats,
    SchedulerError,
    DEFAULT_PAGE_SIZE,
    DEFAULT_STALE_AFTER,
};
