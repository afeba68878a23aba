//! Error taxonomy for release planning and orchestration.

use crate::domain::command_state::TransitionError;
use crate::domain::config::ConfigKey;
use crate::domain::project::ProjectId;

/// Errors produced by the release planning and orchestration layer.
///
/// Job failures are *not* errors: they are recorded as command states.
/// Everything in here either is a user/config mistake or a bug.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// Bad user input, e.g. the root project is unknown or a submodule.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing required config entry `{}`", .0.as_str())]
    MissingConfig(ConfigKey),

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("command {index} of project {project_id} does not exist")]
    CommandNotFound { project_id: ProjectId, index: usize },

    /// A state change was rejected by the command state machine.
    #[error(
        "cannot change the state of command `{command_title}` ({}. command) of project {project_id}: {source}",
        .index + 1
    )]
    InvalidTransition {
        project_id: ProjectId,
        index: usize,
        command_title: String,
        #[source]
        source: TransitionError,
    },

    /// The per-project lock did not prevent a concurrent execution.
    #[error(
        "invalid state {state} for command `{command_title}` ({}. command) of project {project_id}, seems like locking did not work properly",
        .index + 1
    )]
    IllegalDispatch {
        project_id: ProjectId,
        index: usize,
        command_title: String,
        state: String,
    },

    /// An internal invariant was violated (builder or orchestration bug).
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error(
        "could not extract the build number from build url {build_url} (job base url {job_base_url}) of project {project_id}, command `{command_title}` ({}. command)",
        .index + 1
    )]
    CorruptBuildUrl {
        build_url: String,
        job_base_url: String,
        project_id: ProjectId,
        index: usize,
        command_title: String,
    },

    #[error("publish error: {0}")]
    Publish(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReleaseError {
    /// `true` for user/config errors, `false` for bugs and I/O problems.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ReleaseError::InvalidArgument(_)
                | ReleaseError::MissingConfig(_)
                | ReleaseError::ProjectNotFound(_)
                | ReleaseError::InvalidRegex(_)
        )
    }
}

/// Result type for release operations.
pub type Result<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command_state::CommandState;

    #[test]
    fn test_missing_config_names_key() {
        let err = ReleaseError::MissingConfig(ConfigKey::CommitPrefix);
        assert!(err.to_string().contains("commitPrefix"));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_invalid_transition_has_diagnostics() {
        let source = CommandState::Disabled
            .check_transition_allowed(CommandState::Ready)
            .unwrap_err();
        let err = ReleaseError::InvalidTransition {
            project_id: ProjectId::new("com.example:lib"),
            index: 1,
            command_title: "Release".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("com.example:lib"));
        assert!(msg.contains("2. command"));
        assert!(msg.contains("Disabled"));
        assert!(!err.is_user_error());
    }
}
