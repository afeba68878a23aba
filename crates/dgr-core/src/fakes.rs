//! In-memory collaborators for tests and dry simulations.
//!
//! [`ScriptedJobExecutor`] plays jobs by name without talking to a CI server,
//! [`StaticJobDataFactory`] derives job urls from a fixed base url and
//! [`RecordingPublisher`] keeps the last published plan.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::command::{Command, CommandKind};
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::Project;
use crate::plan::ReleasePlan;
use crate::release::executor::{
    poll_until, JobError, JobExecutor, JobObserver, JobResult, PollOptions,
};
use crate::release::job_data::{JobExecutionData, JobExecutionDataFactory};
use crate::release::publisher::StatePublisher;

/// How a scripted job ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobOutcome {
    #[default]
    Succeed,
    Fail,
    /// Never ends, polling runs into its timeout.
    Timeout,
}

/// Runs jobs according to a script keyed by job name; unknown jobs succeed.
///
/// Every job is queued, started and then polled `polls_until_done` times
/// (unless overridden per job), so concurrently running jobs interleave. Start and end of each job are
/// recorded as `start:{job}` and `end:{job}`.
#[derive(Debug)]
pub struct ScriptedJobExecutor {
    outcomes: HashMap<String, JobOutcome>,
    polls_until_done: u32,
    polls_per_job: HashMap<String, u32>,
    next_number: AtomicU64,
    events: Mutex<Vec<String>>,
    re_polled: Mutex<Vec<(String, u64)>>,
}

impl Default for ScriptedJobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedJobExecutor {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            polls_until_done: 2,
            polls_per_job: HashMap::new(),
            next_number: AtomicU64::new(1),
            events: Mutex::new(Vec::new()),
            re_polled: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(mut self, job_name: impl Into<String>, outcome: JobOutcome) -> Self {
        self.outcomes.insert(job_name.into(), outcome);
        self
    }

    pub fn with_polls_until_done(mut self, polls: u32) -> Self {
        self.polls_until_done = polls;
        self
    }

    /// Overrides `polls_until_done` for one job, e.g. to let it finish last.
    pub fn with_polls_for(mut self, job_name: impl Into<String>, polls: u32) -> Self {
        self.polls_per_job.insert(job_name.into(), polls);
        self
    }

    /// Recorded `start:`/`end:` events in order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Position of `event` in [`ScriptedJobExecutor::events`].
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Job names and build numbers passed to [`JobExecutor::re_poll`].
    pub fn re_polled_builds(&self) -> Vec<(String, u64)> {
        self.re_polled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    async fn start(&self, job: &JobExecutionData, observer: &dyn JobObserver) -> JobResult<()> {
        tokio::task::yield_now().await;
        let build_number = self.next_number.fetch_add(1, Ordering::SeqCst);
        observer
            .on_started(build_number)
            .await
            .map_err(JobError::Hook)?;
        self.record(format!("start:{}", job.job_name));
        Ok(())
    }

    async fn run_to_end(&self, job: &JobExecutionData, poll: &PollOptions) -> JobResult<()> {
        let outcome = self
            .outcomes
            .get(&job.job_name)
            .copied()
            .unwrap_or_default();
        let polls_until_done = self
            .polls_per_job
            .get(&job.job_name)
            .copied()
            .unwrap_or(self.polls_until_done);
        let polls = AtomicUsize::new(0);
        let result = poll_until(poll, &job.job_name, || async {
            let n = polls.fetch_add(1, Ordering::SeqCst) as u32;
            match outcome {
                JobOutcome::Timeout => Ok(None),
                _ if n < polls_until_done => Ok(None),
                JobOutcome::Succeed => Ok(Some(())),
                JobOutcome::Fail => Err(JobError::Failed {
                    job_name: job.job_name.clone(),
                    reason: "scripted failure".to_string(),
                }),
            }
        })
        .await;
        self.record(format!("end:{}", job.job_name));
        result
    }
}

#[async_trait::async_trait]
impl JobExecutor for ScriptedJobExecutor {
    async fn trigger(
        &self,
        job: &JobExecutionData,
        observer: &dyn JobObserver,
        poll: &PollOptions,
    ) -> JobResult<()> {
        let queue_number = self.next_number.fetch_add(1, Ordering::SeqCst);
        observer
            .on_queued(&format!("https://queue.invalid/item/{queue_number}/"))
            .await
            .map_err(JobError::Hook)?;
        self.start(job, observer).await?;
        self.run_to_end(job, poll).await
    }

    async fn re_poll_queueing(
        &self,
        job: &JobExecutionData,
        _queued_item_url: &str,
        observer: &dyn JobObserver,
        poll: &PollOptions,
    ) -> JobResult<()> {
        self.start(job, observer).await?;
        self.run_to_end(job, poll).await
    }

    async fn re_poll(
        &self,
        job: &JobExecutionData,
        build_number: u64,
        poll: &PollOptions,
    ) -> JobResult<()> {
        self.re_polled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((job.job_name.clone(), build_number));
        self.record(format!("start:{}", job.job_name));
        self.run_to_end(job, poll).await
    }
}

/// Job urls below a fixed base url, no config needed.
///
/// Release jobs are `{base}job/{artifact id}/`, update-dependency commands all
/// share `{base}job/update-dependency/`. Job names follow the ones of
/// [`crate::release::ConfiguredJobDataFactory`].
#[derive(Debug, Clone)]
pub struct StaticJobDataFactory {
    base_url: String,
}

impl StaticJobDataFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: format!("{}/", base_url.trim_end_matches('/')),
        }
    }
}

impl JobExecutionDataFactory for StaticJobDataFactory {
    fn create(
        &self,
        plan: &ReleasePlan,
        project: &Project,
        command: &Command,
    ) -> Result<JobExecutionData> {
        Ok(match &command.kind {
            CommandKind::UpdateDependency { dependency } => JobExecutionData {
                job_name: format!("update dependency of {}", project.id),
                job_base_url: format!("{}job/update-dependency/", self.base_url),
                parameters: vec![
                    ("dependency".to_string(), dependency.to_string()),
                    (
                        "newVersion".to_string(),
                        plan.project(dependency)?.release_version.clone(),
                    ),
                ],
            },
            CommandKind::ReleasePlugin { next_dev_version }
            | CommandKind::MultiModuleReleasePlugin { next_dev_version } => JobExecutionData {
                job_name: format!("release {}", project.id),
                job_base_url: format!("{}job/{}/", self.base_url, project.id.artifact_id()),
                parameters: vec![
                    ("releaseVersion".to_string(), project.release_version.clone()),
                    ("developmentVersion".to_string(), next_dev_version.clone()),
                ],
            },
        })
    }
}

/// Keeps the last published plan and counts publications.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    saves: AtomicUsize,
    last: Mutex<Option<ReleasePlan>>,
    failing: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publication fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of publication attempts.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<ReleasePlan> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl StatePublisher for RecordingPublisher {
    async fn publish(&self, plan: &ReleasePlan) -> Result<bool> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(ReleaseError::Publish("publisher unavailable".to_string()));
        }
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = last.as_ref() != Some(plan);
        *last = Some(plan.clone());
        Ok(changed)
    }
}
