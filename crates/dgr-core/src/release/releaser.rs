//! Drives the jobs of a [`ReleasePlan`] in dependency order.
//!
//! Starting with the root project, every project runs its non-release commands
//! (including the ones of its submodules) and then its release commands. Once a
//! project succeeded, its dependents stop waiting for it and are released in
//! parallel. A project activation holds the project's lock so that a manual
//! [`Releaser::re_process`] never races with the regular fan-out.
//!
//! Job failures are recorded as command states. Errors returned from here are
//! orchestration bugs or rejected state changes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::Utc;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::domain::command_state::CommandState;
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::ProjectId;
use crate::domain::release_state::ReleaseState;
use crate::obs;
use crate::plan::ReleasePlan;
use crate::release::executor::{JobError, JobExecutor, JobObserver, JobResult, PollOptions};
use crate::release::job_data::{extract_build_number, JobExecutionData, JobExecutionDataFactory};
use crate::release::lock::ProjectLocks;
use crate::release::publisher::{NoopPublisher, StatePublisher};

/// Resulting state per activated project.
pub type ProjectResults = BTreeMap<ProjectId, CommandState>;

type SharedResults = Arc<StdMutex<ProjectResults>>;

#[derive(Clone)]
pub struct Releaser {
    plan: Arc<Mutex<ReleasePlan>>,
    executor: Arc<dyn JobExecutor>,
    factory: Arc<dyn JobExecutionDataFactory>,
    publisher: Arc<dyn StatePublisher>,
    poll: PollOptions,
    locks: Arc<ProjectLocks>,
    additional_triggers: Arc<StdMutex<Vec<JoinHandle<Result<ProjectResults>>>>>,
}

impl Releaser {
    pub fn new(
        plan: ReleasePlan,
        executor: Arc<dyn JobExecutor>,
        factory: Arc<dyn JobExecutionDataFactory>,
    ) -> Self {
        Self {
            plan: Arc::new(Mutex::new(plan)),
            executor,
            factory,
            publisher: Arc::new(NoopPublisher),
            poll: PollOptions::default(),
            locks: Arc::new(ProjectLocks::new()),
            additional_triggers: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn StatePublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// A copy of the plan in its current state.
    pub async fn plan(&self) -> ReleasePlan {
        self.plan.lock().await.clone()
    }

    /// Releases the root project and, transitively, all its dependents.
    ///
    /// Returns `true` if every activated project succeeded or was deactivated
    /// or disabled. Re-processing requests issued while the release runs are
    /// awaited and merged into the result.
    #[instrument(skip(self))]
    pub async fn release(&self) -> Result<bool> {
        let started = Utc::now();
        let (release_id, root_id) = {
            let mut plan = self.plan.lock().await;
            if plan.state() != ReleaseState::InProgress {
                plan.transition_release_state(ReleaseState::InProgress)?;
            }
            (plan.release_id().to_string(), plan.root_project_id().clone())
        };
        obs::emit_release_started(&release_id, &root_id);
        self.quiet_save().await;

        let results: SharedResults = Arc::default();
        let outcome = match self.release_project(root_id, Arc::clone(&results)).await {
            Ok(()) => self.wait_for_additional_triggers(&results).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            self.abort_additional_triggers();
            if let Err(transition) = self
                .plan
                .lock()
                .await
                .transition_release_state(ReleaseState::Failed)
            {
                error!(release_id = %release_id, error = %transition, "could not mark release as failed");
            }
            self.quiet_save().await;
            return Err(err);
        }

        let results = take_results(&results);
        let success = results.values().all(|state| {
            matches!(
                state,
                CommandState::Succeeded | CommandState::Deactivated { .. } | CommandState::Disabled
            )
        });
        if !success && !results.values().any(CommandState::is_failure_state) {
            let stuck: Vec<(ProjectId, CommandState)> = results
                .iter()
                .filter(|(_, state)| {
                    !state.is_end_state()
                        && !matches!(state, CommandState::Deactivated { .. } | CommandState::Disabled)
                })
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect();
            obs::emit_release_inconsistent(&release_id, &stuck);
        }

        {
            let mut plan = self.plan.lock().await;
            let new_state = if success {
                ReleaseState::Succeeded
            } else {
                ReleaseState::Failed
            };
            plan.transition_release_state(new_state)?;
        }
        self.quiet_save().await;

        let duration_ms = (Utc::now() - started).num_milliseconds().max(0) as u64;
        obs::emit_release_finished(&release_id, duration_ms, results.len() as u64, success);
        Ok(success)
    }

    /// Activates `project_id` again, e.g. after a command was re-triggered manually.
    ///
    /// The activation runs in the background; a running [`Releaser::release`]
    /// waits for it and merges its results.
    #[instrument(skip_all, fields(project_id = %project_id))]
    pub async fn re_process(&self, project_id: ProjectId) -> Result<()> {
        self.plan.lock().await.project(&project_id)?;
        let releaser = self.clone();
        let handle = tokio::spawn(async move {
            let results: SharedResults = Arc::default();
            releaser.release_project(project_id, Arc::clone(&results)).await?;
            Ok(take_results(&results))
        });
        self.additional_triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }

    /// Awaits pending re-processing requests and merges their results.
    ///
    /// A `Waiting` result never replaces another one and `Succeeded` is never
    /// replaced.
    async fn wait_for_additional_triggers(&self, results: &SharedResults) -> Result<()> {
        loop {
            let pending: Vec<_> = std::mem::take(
                &mut *self
                    .additional_triggers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if pending.is_empty() {
                return Ok(());
            }
            let mut pending = pending.into_iter();
            while let Some(handle) = pending.next() {
                let additional = match join_additional(handle).await {
                    Ok(additional) => additional,
                    Err(err) => {
                        pending.for_each(|handle| handle.abort());
                        return Err(err);
                    }
                };
                let mut results = results.lock().unwrap_or_else(PoisonError::into_inner);
                for (project_id, state) in additional {
                    if matches!(state, CommandState::Waiting { .. }) {
                        continue;
                    }
                    if results.get(&project_id) == Some(&CommandState::Succeeded) {
                        continue;
                    }
                    results.insert(project_id, state);
                }
            }
        }
    }

    /// Stops re-processing requests nobody is going to wait for.
    fn abort_additional_triggers(&self) {
        let pending = std::mem::take(
            &mut *self
                .additional_triggers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in pending {
            handle.abort();
        }
    }

    fn release_project(&self, project_id: ProjectId, results: SharedResults) -> BoxFuture<'_, Result<()>> {
        async move {
            let dependents = {
                let _guard = self.locks.lock(&project_id).await;
                self.process_project(&project_id, &results).await
            };
            let dependents = match dependents {
                Ok(dependents) => dependents,
                Err(err) => {
                    record(&results, &project_id, CommandState::Failed);
                    return Err(err);
                }
            };
            try_join_all(
                dependents
                    .into_iter()
                    .map(|dependent| self.release_project(dependent, Arc::clone(&results))),
            )
            .await?;
            Ok(())
        }
        .boxed()
    }

    /// Runs the commands of a locked project and returns the dependents to release next.
    async fn process_project(&self, project_id: &ProjectId, results: &SharedResults) -> Result<Vec<ProjectId>> {
        let mut result = self.trigger_non_release_commands(project_id).await?;
        if result == CommandState::Succeeded {
            result = self.trigger_release_commands(project_id).await?;
        }
        obs::emit_project_finished(project_id, &result);
        let succeeded = result == CommandState::Succeeded;
        record(results, project_id, result);
        if !succeeded {
            return Ok(Vec::new());
        }
        self.update_state_waiting(project_id).await
    }

    /// Non-release commands of the project and of its submodules, none of them fail-fast.
    fn trigger_non_release_commands<'a>(&'a self, project_id: &'a ProjectId) -> BoxFuture<'a, Result<CommandState>> {
        async move {
            let (indices, submodules) = {
                let plan = self.plan.lock().await;
                let project = plan.project(project_id)?;
                let indices: Vec<usize> = project
                    .commands
                    .iter()
                    .enumerate()
                    .filter(|(_, command)| !command.is_release_command())
                    .map(|(index, _)| index)
                    .collect();
                (indices, plan.submodules(project_id)?.clone())
            };
            let mut states = Vec::with_capacity(indices.len() + submodules.len());
            for index in indices {
                states.push(self.execute_command(project_id, index).await?);
            }
            for submodule in &submodules {
                states.push(self.trigger_non_release_commands(submodule).await?);
            }
            Ok(first_not_succeeded(states))
        }
        .boxed()
    }

    /// Release commands of the project, stops at the first failure.
    async fn trigger_release_commands(&self, project_id: &ProjectId) -> Result<CommandState> {
        let indices: Vec<usize> = {
            let plan = self.plan.lock().await;
            plan.project(project_id)?
                .commands
                .iter()
                .enumerate()
                .filter(|(_, command)| command.is_release_command())
                .map(|(index, _)| index)
                .collect()
        };
        let mut states = Vec::with_capacity(indices.len());
        for index in indices {
            let state = self.execute_command(project_id, index).await?;
            if state.is_failure_state() {
                return Ok(state);
            }
            states.push(state);
        }
        Ok(first_not_succeeded(states))
    }

    /// Dispatches a command by its current state.
    async fn execute_command(&self, project_id: &ProjectId, index: usize) -> Result<CommandState> {
        let (state, title, build_url) = {
            let plan = self.plan.lock().await;
            let command = plan.command(project_id, index)?;
            (command.state.clone(), command.title(), command.build_url.clone())
        };
        match state {
            CommandState::Ready | CommandState::ReadyToReTrigger => self.trigger(project_id, index).await,
            CommandState::StillQueueing => {
                let queued_item_url = build_url.ok_or_else(|| {
                    ReleaseError::IllegalState(format!(
                        "command `{title}` of project {project_id} is still queueing but has no queued item url"
                    ))
                })?;
                self.re_poll_queueing(project_id, index, &queued_item_url).await
            }
            CommandState::ReadyToRePoll => {
                let build_url = build_url.ok_or_else(|| {
                    ReleaseError::IllegalState(format!(
                        "command `{title}` of project {project_id} should be re-polled but has no build url"
                    ))
                })?;
                self.re_poll(project_id, index, &build_url).await
            }
            CommandState::Queueing | CommandState::InProgress | CommandState::RePolling => {
                Err(ReleaseError::IllegalDispatch {
                    project_id: project_id.clone(),
                    index,
                    command_title: title,
                    state: state.to_string(),
                })
            }
            CommandState::Waiting { .. }
            | CommandState::Succeeded
            | CommandState::Failed
            | CommandState::Timeout { .. }
            | CommandState::Deactivated { .. }
            | CommandState::Disabled => Ok(state),
        }
    }

    async fn job_data(&self, project_id: &ProjectId, index: usize) -> Result<JobExecutionData> {
        let plan = self.plan.lock().await;
        let project = plan.project(project_id)?;
        let command = plan.command(project_id, index)?;
        self.factory.create(&plan, project, command)
    }

    async fn trigger(&self, project_id: &ProjectId, index: usize) -> Result<CommandState> {
        let job = self.job_data(project_id, index).await?;
        debug!(project_id = %project_id, index, job = %job.job_name, "triggering job");
        let observer = CommandObserver {
            releaser: self,
            project_id,
            index,
            job: &job,
        };
        let outcome = self.executor.trigger(&job, &observer, &self.poll).await;
        self.finish_job(project_id, index, &job, outcome).await
    }

    async fn re_poll_queueing(&self, project_id: &ProjectId, index: usize, queued_item_url: &str) -> Result<CommandState> {
        let job = self.job_data(project_id, index).await?;
        debug!(project_id = %project_id, index, job = %job.job_name, "re-polling queued job");
        let observer = CommandObserver {
            releaser: self,
            project_id,
            index,
            job: &job,
        };
        let outcome = self
            .executor
            .re_poll_queueing(&job, queued_item_url, &observer, &self.poll)
            .await;
        self.finish_job(project_id, index, &job, outcome).await
    }

    async fn re_poll(&self, project_id: &ProjectId, index: usize, build_url: &str) -> Result<CommandState> {
        let job = self.job_data(project_id, index).await?;
        let build_number = {
            let plan = self.plan.lock().await;
            extract_build_number(build_url, &job, project_id, index, plan.command(project_id, index)?)?
        };
        self.change_state(project_id, index, CommandState::RePolling, None).await?;
        debug!(project_id = %project_id, index, job = %job.job_name, build_number, "re-polling job");
        let outcome = self.executor.re_poll(&job, build_number, &self.poll).await;
        self.finish_job(project_id, index, &job, outcome).await
    }

    /// Records the outcome of a job as command state.
    async fn finish_job(
        &self,
        project_id: &ProjectId,
        index: usize,
        job: &JobExecutionData,
        outcome: JobResult<()>,
    ) -> Result<CommandState> {
        let new_state = match outcome {
            Ok(()) => CommandState::Succeeded,
            Err(JobError::Hook(err)) => return Err(err),
            Err(JobError::PollTimeout { waited, .. }) => {
                let previous = self.plan.lock().await.command_state(project_id, index)?.clone();
                let timeout = CommandState::Timeout {
                    previous: Box::new(previous.clone()),
                };
                warn!(project_id = %project_id, index, job = %job.job_name, ?waited, "job timed out");
                // a job still waiting in the queue after recovery has no timeout state to go to
                match previous.check_transition_allowed(timeout) {
                    Ok(timeout) => timeout,
                    Err(_) => CommandState::Failed,
                }
            }
            Err(JobError::Failed { reason, .. }) => {
                warn!(project_id = %project_id, index, job = %job.job_name, reason = %reason, "job failed");
                CommandState::Failed
            }
        };
        self.change_state(project_id, index, new_state.clone(), None).await?;
        Ok(new_state)
    }

    /// Transitions a command (and optionally sets its build url).
    async fn change_state(
        &self,
        project_id: &ProjectId,
        index: usize,
        new_state: CommandState,
        build_url: Option<String>,
    ) -> Result<()> {
        let mut plan = self.plan.lock().await;
        let previous = plan.transition_command(project_id, index, new_state.clone())?;
        if let Some(build_url) = build_url {
            plan.set_build_url(project_id, index, build_url)?;
        }
        obs::emit_command_state_changed(project_id, index, &previous, &new_state);
        Ok(())
    }

    /// Removes the project from the `Waiting` states of its dependents and
    /// returns the non-submodule dependents.
    async fn update_state_waiting(&self, project_id: &ProjectId) -> Result<Vec<ProjectId>> {
        let mut plan = self.plan.lock().await;
        let pairs = plan.collect_dependents_incl_dependents_of_all_submodules(project_id)?;
        let mut dependents = Vec::new();
        for (dependency_id, dependent_id) in pairs {
            for (index, previous, new) in plan.resolve_waiting_dependency(&dependent_id, &dependency_id)? {
                obs::emit_command_state_changed(&dependent_id, index, &previous, &new);
            }
            if !plan.project(&dependent_id)?.is_submodule && !dependents.contains(&dependent_id) {
                dependents.push(dependent_id);
            }
        }
        dependents.sort();
        Ok(dependents)
    }

    /// Publishes the plan, failures are only logged.
    async fn quiet_save(&self) {
        let plan = self.plan.lock().await;
        match self.publisher.publish(&plan).await {
            Ok(true) => {}
            Ok(false) => debug!(release_id = %plan.release_id(), "plan state unchanged, nothing published"),
            Err(err) => obs::emit_save_failed(plan.release_id(), &err),
        }
    }
}

/// Persists queue and start events of one command's job.
struct CommandObserver<'a> {
    releaser: &'a Releaser,
    project_id: &'a ProjectId,
    index: usize,
    job: &'a JobExecutionData,
}

#[async_trait::async_trait]
impl JobObserver for CommandObserver<'_> {
    async fn on_queued(&self, queued_item_url: &str) -> Result<()> {
        self.releaser
            .change_state(
                self.project_id,
                self.index,
                CommandState::Queueing,
                Some(queued_item_url.to_string()),
            )
            .await?;
        self.releaser.quiet_save().await;
        Ok(())
    }

    async fn on_started(&self, build_number: u64) -> Result<()> {
        self.releaser
            .change_state(
                self.project_id,
                self.index,
                CommandState::InProgress,
                Some(self.job.build_url(build_number)),
            )
            .await
    }
}

fn record(results: &SharedResults, project_id: &ProjectId, state: CommandState) {
    results
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(project_id.clone(), state);
}

async fn join_additional(handle: JoinHandle<Result<ProjectResults>>) -> Result<ProjectResults> {
    handle
        .await
        .map_err(|err| ReleaseError::IllegalState(format!("re-process task failed: {err}")))?
}

fn take_results(results: &SharedResults) -> ProjectResults {
    std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner))
}

fn first_not_succeeded(states: Vec<CommandState>) -> CommandState {
    states
        .into_iter()
        .find(|state| *state != CommandState::Succeeded)
        .unwrap_or(CommandState::Succeeded)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;
    use crate::domain::command::Command;
    use crate::domain::config::Config;
    use crate::domain::project::Project;
    use crate::domain::release_state::TypeOfRun;
    use crate::fakes::{JobOutcome, RecordingPublisher, ScriptedJobExecutor, StaticJobDataFactory};
    use crate::plan::ReleasePlanParts;

    fn project(id: &str, level: u32, commands: Vec<Command>) -> Project {
        Project {
            id: ProjectId::new(id),
            is_submodule: false,
            current_version: "1.0-SNAPSHOT".to_string(),
            release_version: "1.0".to_string(),
            level,
            commands,
            relative_path: format!("{id}/"),
        }
    }

    fn release(state: CommandState) -> Command {
        Command::release_plugin(false, "1.1-SNAPSHOT", state)
    }

    /// root <- dep (dep waits for root)
    fn two_projects() -> ReleasePlan {
        let root = ProjectId::new("root");
        let dep = ProjectId::new("dep");
        ReleasePlan::from_parts(ReleasePlanParts {
            release_id: "test".to_string(),
            state: ReleaseState::Ready,
            type_of_run: TypeOfRun::Release,
            root_project_id: root.clone(),
            projects: BTreeMap::from([
                (root.clone(), project("root", 0, vec![release(CommandState::Ready)])),
                (
                    dep.clone(),
                    project(
                        "dep",
                        1,
                        vec![
                            Command::update_dependency(root.clone(), CommandState::waiting_for(root.clone())),
                            release(CommandState::waiting_for(root.clone())),
                        ],
                    ),
                ),
            ]),
            submodules: BTreeMap::new(),
            dependents: BTreeMap::from([
                (root.clone(), BTreeSet::from([dep.clone()])),
                (dep, BTreeSet::new()),
            ]),
            warnings: vec![],
            infos: vec![],
            config: Config::new(),
        })
        .unwrap()
    }

    fn poll() -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }

    fn releaser(plan: ReleasePlan, executor: Arc<ScriptedJobExecutor>) -> Releaser {
        Releaser::new(plan, executor, Arc::new(StaticJobDataFactory::new("https://ci.example/")))
            .with_poll_options(poll())
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_succeeds_and_records_build_urls() {
        let executor = Arc::new(ScriptedJobExecutor::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let releaser = releaser(two_projects(), Arc::clone(&executor)).with_publisher(publisher.clone());

        assert!(releaser.release().await.unwrap());

        let plan = releaser.plan().await;
        assert_eq!(plan.state(), ReleaseState::Succeeded);
        for id in ["root", "dep"] {
            for command in &plan.project(&ProjectId::new(id)).unwrap().commands {
                assert_eq!(command.state, CommandState::Succeeded);
                assert!(command.build_url.as_deref().unwrap().starts_with("https://ci.example/"));
            }
        }
        assert!(publisher.saves() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_recorded_not_raised() {
        let executor = Arc::new(ScriptedJobExecutor::new().with_outcome("release root", JobOutcome::Fail));
        let releaser = releaser(two_projects(), executor);

        assert!(!releaser.release().await.unwrap());

        let plan = releaser.plan().await;
        assert_eq!(plan.state(), ReleaseState::Failed);
        assert_eq!(plan.command_state(&ProjectId::new("root"), 0).unwrap(), &CommandState::Failed);
        assert!(matches!(
            plan.command_state(&ProjectId::new("dep"), 1).unwrap(),
            CommandState::Waiting { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_keeps_previous_state() {
        let executor = Arc::new(ScriptedJobExecutor::new().with_outcome("release root", JobOutcome::Timeout));
        let releaser = releaser(two_projects(), executor);

        assert!(!releaser.release().await.unwrap());

        let plan = releaser.plan().await;
        assert_eq!(
            plan.command_state(&ProjectId::new("root"), 0).unwrap(),
            &CommandState::Timeout {
                previous: Box::new(CommandState::InProgress)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_state_is_illegal_dispatch() {
        let mut plan = two_projects();
        let root = ProjectId::new("root");
        plan.transition_command(&root, 0, CommandState::Queueing).unwrap();
        let releaser = releaser(plan, Arc::new(ScriptedJobExecutor::new()));

        let err = releaser.release().await.unwrap_err();
        assert!(matches!(err, ReleaseError::IllegalDispatch { index: 0, .. }));
        assert_eq!(releaser.plan().await.state(), ReleaseState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_release_aborts_pending_re_processing() {
        let mut plan = two_projects();
        let root = ProjectId::new("root");
        plan.transition_command(&root, 0, CommandState::Queueing).unwrap();
        let executor = Arc::new(ScriptedJobExecutor::new());
        let releaser = releaser(plan, Arc::clone(&executor));
        releaser.re_process(root.clone()).await.unwrap();

        assert!(matches!(
            releaser.release().await,
            Err(ReleaseError::IllegalDispatch { .. })
        ));
        assert!(releaser.additional_triggers.lock().unwrap().is_empty());
        assert_eq!(releaser.plan().await.state(), ReleaseState::Failed);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(executor.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovered_commands_are_re_polled() {
        let mut plan = two_projects();
        let root = ProjectId::new("root");
        plan.transition_command(&root, 0, CommandState::Queueing).unwrap();
        plan.transition_command(&root, 0, CommandState::InProgress).unwrap();
        plan.set_build_url(&root, 0, "https://ci.example/job/root/7/".to_string())
            .unwrap();
        assert_eq!(plan.recover_interrupted().unwrap(), 1);

        let executor = Arc::new(ScriptedJobExecutor::new());
        let releaser = releaser(plan, Arc::clone(&executor));
        assert!(releaser.release().await.unwrap());
        assert_eq!(executor.re_polled_builds(), vec![("release root".to_string(), 7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_build_url_is_fatal() {
        let mut plan = two_projects();
        let root = ProjectId::new("root");
        plan.transition_command(&root, 0, CommandState::Queueing).unwrap();
        plan.transition_command(&root, 0, CommandState::InProgress).unwrap();
        plan.set_build_url(&root, 0, "https://elsewhere/1/".to_string()).unwrap();
        plan.recover_interrupted().unwrap();

        let releaser = releaser(plan, Arc::new(ScriptedJobExecutor::new()));
        assert!(matches!(
            releaser.release().await,
            Err(ReleaseError::CorruptBuildUrl { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_re_process_unknown_project() {
        let releaser = releaser(two_projects(), Arc::new(ScriptedJobExecutor::new()));
        assert!(matches!(
            releaser.re_process(ProjectId::new("nope")).await,
            Err(ReleaseError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_first_not_succeeded() {
        assert_eq!(first_not_succeeded(vec![]), CommandState::Succeeded);
        assert_eq!(
            first_not_succeeded(vec![CommandState::Succeeded, CommandState::Failed, CommandState::Disabled]),
            CommandState::Failed
        );
    }
}
