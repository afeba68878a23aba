//! Release orchestration: job execution, per-project locking, state publication.

pub mod executor;
pub mod job_data;
pub mod lock;
pub mod publisher;
pub mod releaser;

pub use executor::{poll_until, JobError, JobExecutor, JobObserver, JobResult, PollOptions};
pub use job_data::{
    extract_build_number, ConfiguredJobDataFactory, JobExecutionData, JobExecutionDataFactory,
};
pub use lock::{ProjectLockGuard, ProjectLocks};
pub use publisher::{JsonFilePublisher, NoopPublisher, StatePublisher};
pub use releaser::{ProjectResults, Releaser};
