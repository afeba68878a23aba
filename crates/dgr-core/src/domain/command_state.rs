//! Lifecycle of a single command.
//!
//! [`CommandState`] is a closed set of states; every change goes through
//! [`CommandState::check_transition_allowed`], which rejects any transition
//! not backed by the predecessor table below.
//!
//! | new state          | required current state(s)             |
//! |--------------------|---------------------------------------|
//! | `ReadyToRePoll`    | `Timeout`                             |
//! | `ReadyToReTrigger` | `Failed`, `Timeout`                   |
//! | `Ready`            | `Waiting` without dependencies        |
//! | `Queueing`         | `Ready`, `ReadyToReTrigger`           |
//! | `StillQueueing`    | `Queueing`, `Timeout`                 |
//! | `InProgress`       | `Queueing`, `StillQueueing`           |
//! | `RePolling`        | `ReadyToRePoll`                       |
//! | `Succeeded`        | `InProgress`, `RePolling`             |
//! | `Timeout`          | `Queueing`, `InProgress`, `RePolling` |
//! | `Waiting`, `Failed`, `Deactivated`, `Disabled` | any        |
//!
//! `Disabled` has no outgoing transitions and `Deactivated(previous)` may only
//! go back to a state of the same kind as `previous`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommandState {
    /// Waits until every project in `dependencies` has been released.
    Waiting { dependencies: BTreeSet<ProjectId> },
    Ready,
    ReadyToReTrigger,
    ReadyToRePoll,
    /// The job is queued to be executed.
    Queueing,
    /// The job was queueing before an interrupted run was recovered and still is.
    StillQueueing,
    InProgress,
    /// A running job is polled again after a timeout.
    RePolling,
    Succeeded,
    Failed,
    /// Polling ran into a timeout, the command was in `previous` before.
    Timeout { previous: Box<CommandState> },
    /// Deactivated by the user, may be reactivated to `previous`.
    Deactivated { previous: Box<CommandState> },
    /// Cannot be reactivated, in contrast to [`CommandState::Deactivated`].
    Disabled,
}

/// The variant of a [`CommandState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Waiting,
    Ready,
    ReadyToReTrigger,
    ReadyToRePoll,
    Queueing,
    StillQueueing,
    InProgress,
    RePolling,
    Succeeded,
    Failed,
    Timeout,
    Deactivated,
    Disabled,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Waiting => "Waiting",
            StateKind::Ready => "Ready",
            StateKind::ReadyToReTrigger => "ReadyToReTrigger",
            StateKind::ReadyToRePoll => "ReadyToRePoll",
            StateKind::Queueing => "Queueing",
            StateKind::StillQueueing => "StillQueueing",
            StateKind::InProgress => "InProgress",
            StateKind::RePolling => "RePolling",
            StateKind::Succeeded => "Succeeded",
            StateKind::Failed => "Failed",
            StateKind::Timeout => "Timeout",
            StateKind::Deactivated => "Deactivated",
            StateKind::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of a state change by [`CommandState::check_transition_allowed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition from {current} to {new}: {reason}")]
pub struct TransitionError {
    pub current: String,
    pub new: String,
    pub reason: String,
}

impl TransitionError {
    fn new(current: &CommandState, new: &CommandState, reason: impl Into<String>) -> Self {
        Self {
            current: current.to_string(),
            new: new.to_string(),
            reason: reason.into(),
        }
    }
}

impl CommandState {
    pub fn waiting_for(dependency: ProjectId) -> Self {
        CommandState::Waiting {
            dependencies: BTreeSet::from([dependency]),
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            CommandState::Waiting { .. } => StateKind::Waiting,
            CommandState::Ready => StateKind::Ready,
            CommandState::ReadyToReTrigger => StateKind::ReadyToReTrigger,
            CommandState::ReadyToRePoll => StateKind::ReadyToRePoll,
            CommandState::Queueing => StateKind::Queueing,
            CommandState::StillQueueing => StateKind::StillQueueing,
            CommandState::InProgress => StateKind::InProgress,
            CommandState::RePolling => StateKind::RePolling,
            CommandState::Succeeded => StateKind::Succeeded,
            CommandState::Failed => StateKind::Failed,
            CommandState::Timeout { .. } => StateKind::Timeout,
            CommandState::Deactivated { .. } => StateKind::Deactivated,
            CommandState::Disabled => StateKind::Disabled,
        }
    }

    pub fn is_failure_state(&self) -> bool {
        matches!(self, CommandState::Failed | CommandState::Timeout { .. })
    }

    pub fn is_end_state(&self) -> bool {
        matches!(self, CommandState::Succeeded) || self.is_failure_state()
    }

    /// Returns `new` if the transition from `self` is allowed.
    pub fn check_transition_allowed(
        &self,
        new: CommandState,
    ) -> Result<CommandState, TransitionError> {
        if matches!(self, CommandState::Disabled) {
            return Err(TransitionError::new(
                self,
                &new,
                "Disabled is a terminal state",
            ));
        }
        if self.kind() == new.kind() {
            return Err(TransitionError::new(
                self,
                &new,
                "the state has to change",
            ));
        }
        if let CommandState::Deactivated { previous } = self {
            if previous.kind() != new.kind() {
                return Err(TransitionError::new(
                    self,
                    &new,
                    format!(
                        "a deactivated command can only go back to its previous state {}",
                        previous.kind()
                    ),
                ));
            }
            return Ok(new);
        }

        let required: &[StateKind] = match new {
            CommandState::ReadyToRePoll => &[StateKind::Timeout],
            CommandState::ReadyToReTrigger => &[StateKind::Failed, StateKind::Timeout],
            CommandState::Ready => &[StateKind::Waiting],
            CommandState::Queueing => &[StateKind::Ready, StateKind::ReadyToReTrigger],
            CommandState::StillQueueing => &[StateKind::Queueing, StateKind::Timeout],
            CommandState::InProgress => &[StateKind::Queueing, StateKind::StillQueueing],
            CommandState::RePolling => &[StateKind::ReadyToRePoll],
            CommandState::Succeeded => &[StateKind::InProgress, StateKind::RePolling],
            CommandState::Timeout { .. } => &[
                StateKind::Queueing,
                StateKind::InProgress,
                StateKind::RePolling,
            ],
            CommandState::Waiting { .. }
            | CommandState::Failed
            | CommandState::Deactivated { .. }
            | CommandState::Disabled => return Ok(new),
        };

        if !required.contains(&self.kind()) {
            let expected = required
                .iter()
                .map(StateKind::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TransitionError::new(
                self,
                &new,
                format!("state is not one of: {expected}"),
            ));
        }

        if let CommandState::Waiting { dependencies } = self {
            if !dependencies.is_empty() {
                return Err(TransitionError::new(
                    self,
                    &new,
                    "there are still dependencies to wait for",
                ));
            }
        }
        Ok(new)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandState::Waiting { dependencies } => {
                let ids: Vec<&str> = dependencies.iter().map(ProjectId::identifier).collect();
                write!(f, "Waiting([{}])", ids.join(", "))
            }
            CommandState::Timeout { previous } => write!(f, "Timeout({previous})"),
            CommandState::Deactivated { previous } => write!(f, "Deactivated({previous})"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}
