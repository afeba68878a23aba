//! The job execution backend the releaser drives.
//!
//! A [`JobExecutor`] triggers a job, reports progress through a
//! [`JobObserver`] and polls until the job ended. Success is `Ok(())`, a failed
//! job is [`JobError::Failed`] and exceeding [`PollOptions::max_wait`] is
//! [`JobError::PollTimeout`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::domain::error::ReleaseError;
use crate::release::job_data::JobExecutionData;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {job_name} failed: {reason}")]
    Failed { job_name: String, reason: String },

    #[error("job {job_name} did not finish within {waited:?}")]
    PollTimeout { job_name: String, waited: Duration },

    /// A state change requested by a [`JobObserver`] was rejected.
    #[error("job callback failed: {0}")]
    Hook(#[source] ReleaseError),
}

pub type JobResult<T> = std::result::Result<T, JobError>;

/// Polling cadence of a [`JobExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// First delay between two polls; doubles up to four times this value.
    pub interval: Duration,
    /// Polling gives up with [`JobError::PollTimeout`] after this duration.
    pub max_wait: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(15 * 60),
        }
    }
}

/// Progress callbacks of a running job.
#[async_trait::async_trait]
pub trait JobObserver: Send + Sync {
    /// The job was accepted and waits in the queue at `queued_item_url`.
    async fn on_queued(&self, queued_item_url: &str) -> Result<(), ReleaseError>;

    /// The job left the queue and runs as build `build_number`.
    async fn on_started(&self, build_number: u64) -> Result<(), ReleaseError>;
}

#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Triggers the job and polls until it ended.
    async fn trigger(
        &self,
        job: &JobExecutionData,
        observer: &dyn JobObserver,
        poll: &PollOptions,
    ) -> JobResult<()>;

    /// Polls a job which was queued before but did not start yet.
    async fn re_poll_queueing(
        &self,
        job: &JobExecutionData,
        queued_item_url: &str,
        observer: &dyn JobObserver,
        poll: &PollOptions,
    ) -> JobResult<()>;

    /// Polls the already running build `build_number` until it ended.
    async fn re_poll(
        &self,
        job: &JobExecutionData,
        build_number: u64,
        poll: &PollOptions,
    ) -> JobResult<()>;
}

/// Calls `check` until it yields a value, backing off exponentially.
///
/// Fails with [`JobError::PollTimeout`] once `max_wait` elapsed.
pub async fn poll_until<T, F, Fut>(options: &PollOptions, job_name: &str, mut check: F) -> JobResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = JobResult<Option<T>>>,
{
    let start = Instant::now();
    let cap = options.interval * 4;
    let mut delay = options.interval;
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        let waited = start.elapsed();
        if waited >= options.max_wait {
            return Err(JobError::PollTimeout {
                job_name: job_name.to_string(),
                waited,
            });
        }
        tokio::time::sleep(delay.min(options.max_wait - waited)).await;
        delay = (delay * 2).min(cap);
    }
}
