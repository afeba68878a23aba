//! State changes on a built [`ReleasePlan`].
//!
//! The orchestrator changes command states through
//! [`ReleasePlan::transition_command`]. The remaining functions are user
//! overrides; they are refused while a release is running or watched.

use crate::domain::command::Command;
use crate::domain::command_state::{CommandState, StateKind, TransitionError};
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::{Project, ProjectId};
use crate::domain::release_state::ReleaseState;
use crate::plan::release_plan::ReleasePlan;

impl ReleasePlan {
    pub fn command(&self, project_id: &ProjectId, index: usize) -> Result<&Command> {
        self.project(project_id)?
            .commands
            .get(index)
            .ok_or_else(|| ReleaseError::CommandNotFound {
                project_id: project_id.clone(),
                index,
            })
    }

    pub fn command_state(&self, project_id: &ProjectId, index: usize) -> Result<&CommandState> {
        Ok(&self.command(project_id, index)?.state)
    }

    fn command_mut(&mut self, project_id: &ProjectId, index: usize) -> Result<&mut Command> {
        self.projects
            .get_mut(project_id)
            .ok_or_else(|| ReleaseError::ProjectNotFound(project_id.clone()))?
            .commands
            .get_mut(index)
            .ok_or_else(|| ReleaseError::CommandNotFound {
                project_id: project_id.clone(),
                index,
            })
    }

    /// Changes the state of a command if the state machine allows it.
    ///
    /// Returns the previous state.
    pub fn transition_command(
        &mut self,
        project_id: &ProjectId,
        index: usize,
        new_state: CommandState,
    ) -> Result<CommandState> {
        let command = self.command_mut(project_id, index)?;
        let new_state =
            command
                .state
                .check_transition_allowed(new_state)
                .map_err(|source| ReleaseError::InvalidTransition {
                    project_id: project_id.clone(),
                    index,
                    command_title: command.title(),
                    source,
                })?;
        Ok(std::mem::replace(&mut command.state, new_state))
    }

    pub fn set_build_url(
        &mut self,
        project_id: &ProjectId,
        index: usize,
        build_url: impl Into<String>,
    ) -> Result<()> {
        self.command_mut(project_id, index)?.build_url = Some(build_url.into());
        Ok(())
    }

    /// Removes `dependency_id` from the `Waiting` commands of `dependent_id`.
    ///
    /// A command left without dependencies becomes `Ready`. Deactivated
    /// commands are updated as well so that reactivating them restores the
    /// right state. Returns `(index, previous, new)` of every changed state.
    pub fn resolve_waiting_dependency(
        &mut self,
        dependent_id: &ProjectId,
        dependency_id: &ProjectId,
    ) -> Result<Vec<(usize, CommandState, CommandState)>> {
        let number_of_commands = self.project(dependent_id)?.commands.len();
        let mut changes = Vec::new();
        for index in 0..number_of_commands {
            let command = self.command_mut(dependent_id, index)?;
            let (dependencies, deactivated) = match &mut command.state {
                CommandState::Waiting { dependencies } => (dependencies, false),
                CommandState::Deactivated { previous } => match previous.as_mut() {
                    CommandState::Waiting { dependencies } => (dependencies, true),
                    _ => continue,
                },
                _ => continue,
            };
            if !dependencies.remove(dependency_id) || !dependencies.is_empty() {
                continue;
            }
            if deactivated {
                command.state = CommandState::Deactivated {
                    previous: Box::new(CommandState::Ready),
                };
            } else {
                let previous = self.transition_command(dependent_id, index, CommandState::Ready)?;
                changes.push((index, previous, CommandState::Ready));
            }
        }
        Ok(changes)
    }

    pub fn transition_release_state(&mut self, new_state: ReleaseState) -> Result<()> {
        self.state = self.state.check_transition_allowed(new_state)?;
        Ok(())
    }

    fn ensure_not_running(&self, action: &str) -> Result<()> {
        match self.state {
            ReleaseState::InProgress | ReleaseState::Watching => Err(ReleaseError::IllegalState(
                format!("cannot {action} while the release is {}", self.state),
            )),
            _ => Ok(()),
        }
    }

    pub fn set_release_version(
        &mut self,
        project_id: &ProjectId,
        release_version: impl Into<String>,
    ) -> Result<()> {
        self.ensure_not_running("change a release version")?;
        let release_version = release_version.into();
        if release_version.trim().is_empty() {
            return Err(ReleaseError::InvalidArgument(format!(
                "release version of {project_id} must not be empty"
            )));
        }
        self.projects
            .get_mut(project_id)
            .ok_or_else(|| ReleaseError::ProjectNotFound(project_id.clone()))?
            .release_version = release_version;
        Ok(())
    }

    /// Deactivates a command, it can be reactivated later on.
    pub fn deactivate_command(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("deactivate a command")?;
        let current = self.command_state(project_id, index)?.clone();
        if matches!(
            current.kind(),
            StateKind::Deactivated | StateKind::Succeeded | StateKind::Disabled
        ) {
            return Err(self.refused(project_id, index, &current, "Deactivated"));
        }
        self.transition_command(
            project_id,
            index,
            CommandState::Deactivated {
                previous: Box::new(current),
            },
        )?;
        Ok(())
    }

    /// Restores the state a command had before it was deactivated.
    pub fn reactivate_command(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("reactivate a command")?;
        let CommandState::Deactivated { previous } = self.command_state(project_id, index)?.clone()
        else {
            let current = self.command_state(project_id, index)?.clone();
            return Err(self.refused(project_id, index, &current, "its previous state"));
        };
        self.transition_command(project_id, index, *previous)?;
        Ok(())
    }

    pub fn disable_command(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("disable a command")?;
        self.transition_command(project_id, index, CommandState::Disabled)?;
        Ok(())
    }

    /// Marks a command as succeeded without running it.
    ///
    /// A release command can only be forced once every other command of the
    /// project (incl. its submodules) succeeded, see [`Self::force_project_succeeded`].
    pub fn force_succeeded(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("force a command to succeed")?;
        let command = self.command(project_id, index)?;
        if command.is_release_command() && !self.all_other_commands_succeeded(project_id, Some(index))? {
            return Err(ReleaseError::InvalidArgument(format!(
                "cannot set `{}` ({}. command) of {project_id} to Succeeded, not all other commands of the project succeeded yet",
                command.title(),
                index + 1
            )));
        }
        self.force_command_succeeded(project_id, index)
    }

    /// Marks every command of a project and of its (nested) submodules as succeeded.
    pub fn force_project_succeeded(&mut self, project_id: &ProjectId) -> Result<()> {
        self.ensure_not_running("force a project to succeed")?;
        let mut to_visit = vec![project_id.clone()];
        while let Some(id) = to_visit.pop() {
            let number_of_commands = self.project(&id)?.commands.len();
            for index in 0..number_of_commands {
                let state = self.command_state(&id, index)?;
                if matches!(state.kind(), StateKind::Succeeded | StateKind::Disabled) {
                    continue;
                }
                self.force_command_succeeded(&id, index)?;
            }
            to_visit.extend(self.submodules(&id)?.iter().cloned());
        }
        Ok(())
    }

    fn force_command_succeeded(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        let current = self.command_state(project_id, index)?.clone();
        if matches!(
            current.kind(),
            StateKind::Succeeded | StateKind::Deactivated | StateKind::Disabled
        ) {
            return Err(self.refused(project_id, index, &current, "Succeeded"));
        }
        self.command_mut(project_id, index)?.state = CommandState::Succeeded;
        Ok(())
    }

    fn all_other_commands_succeeded(
        &self,
        project_id: &ProjectId,
        except: Option<usize>,
    ) -> Result<bool> {
        let project = self.project(project_id)?;
        let own = project
            .commands
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != except)
            .all(|(_, c)| c.state == CommandState::Succeeded);
        if !own {
            return Ok(false);
        }
        for submodule in self.submodules(project_id)? {
            if !self.all_other_commands_succeeded(submodule, None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Prepares a failed or timed out command to be triggered again.
    pub fn prepare_retrigger(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("re-trigger a command")?;
        self.transition_command(project_id, index, CommandState::ReadyToReTrigger)?;
        Ok(())
    }

    /// Prepares a timed out command to be polled again.
    ///
    /// A command which timed out while queueing polls the queue again,
    /// otherwise the build itself is polled.
    pub fn prepare_repoll(&mut self, project_id: &ProjectId, index: usize) -> Result<()> {
        self.ensure_not_running("re-poll a command")?;
        let new_state = match self.command_state(project_id, index)? {
            CommandState::Timeout { previous } if previous.kind() == StateKind::Queueing => {
                CommandState::StillQueueing
            }
            _ => CommandState::ReadyToRePoll,
        };
        self.transition_command(project_id, index, new_state)?;
        Ok(())
    }

    /// Moves commands left in flight by an interrupted run into states the
    /// orchestrator can resume from.
    ///
    /// Returns the number of commands changed.
    pub fn recover_interrupted(&mut self) -> Result<usize> {
        let in_flight: Vec<(ProjectId, usize, CommandState)> = self
            .projects()
            .flat_map(|project: &Project| {
                project
                    .commands
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| {
                        matches!(
                            c.state,
                            CommandState::Queueing
                                | CommandState::InProgress
                                | CommandState::RePolling
                        )
                    })
                    .map(|(i, c)| (project.id.clone(), i, c.state.clone()))
            })
            .collect();

        for (project_id, index, state) in &in_flight {
            if *state == CommandState::Queueing {
                self.transition_command(project_id, *index, CommandState::StillQueueing)?;
            } else {
                self.transition_command(
                    project_id,
                    *index,
                    CommandState::Timeout {
                        previous: Box::new(state.clone()),
                    },
                )?;
                self.transition_command(project_id, *index, CommandState::ReadyToRePoll)?;
            }
        }
        Ok(in_flight.len())
    }

    fn refused(
        &self,
        project_id: &ProjectId,
        index: usize,
        current: &CommandState,
        target: &str,
    ) -> ReleaseError {
        ReleaseError::InvalidTransition {
            project_id: project_id.clone(),
            index,
            command_title: self
                .command(project_id, index)
                .map(Command::title)
                .unwrap_or_default(),
            source: TransitionError {
                current: current.to_string(),
                new: target.to_string(),
                reason: format!("not possible from {}", current.kind()),
            },
        }
    }
}
