//! Executable units attached to a project.

use serde::{Deserialize, Serialize};

use crate::domain::command_state::CommandState;
use crate::domain::project::ProjectId;

/// What a command does.
///
/// The two release-plugin variants are *release commands*: they run only once
/// every other command of the project (incl. its submodules) succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Release plugin invocation for a single-module project.
    ReleasePlugin { next_dev_version: String },
    /// Release plugin invocation releasing a multi-module project with all its submodules.
    MultiModuleReleasePlugin { next_dev_version: String },
    /// Updates the version of `dependency` in the project's descriptor.
    UpdateDependency { dependency: ProjectId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub state: CommandState,
    /// Queued item url or build url of the job executing this command, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
}

impl Command {
    pub fn new(kind: CommandKind, state: CommandState) -> Self {
        Self {
            kind,
            state,
            build_url: None,
        }
    }

    pub fn release_plugin(
        is_multi_module: bool,
        next_dev_version: impl Into<String>,
        state: CommandState,
    ) -> Self {
        let next_dev_version = next_dev_version.into();
        let kind = if is_multi_module {
            CommandKind::MultiModuleReleasePlugin { next_dev_version }
        } else {
            CommandKind::ReleasePlugin { next_dev_version }
        };
        Self::new(kind, state)
    }

    pub fn update_dependency(dependency: ProjectId, state: CommandState) -> Self {
        Self::new(CommandKind::UpdateDependency { dependency }, state)
    }

    pub fn is_release_command(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::ReleasePlugin { .. } | CommandKind::MultiModuleReleasePlugin { .. }
        )
    }

    /// The dependency an update-dependency command resolves, if any.
    pub fn updated_dependency(&self) -> Option<&ProjectId> {
        match &self.kind {
            CommandKind::UpdateDependency { dependency } => Some(dependency),
            _ => None,
        }
    }

    pub fn next_dev_version(&self) -> Option<&str> {
        match &self.kind {
            CommandKind::ReleasePlugin { next_dev_version }
            | CommandKind::MultiModuleReleasePlugin { next_dev_version } => {
                Some(next_dev_version)
            }
            CommandKind::UpdateDependency { .. } => None,
        }
    }

    /// Human readable title used in diagnostics.
    pub fn title(&self) -> String {
        match &self.kind {
            CommandKind::ReleasePlugin { .. } => "Release".to_string(),
            CommandKind::MultiModuleReleasePlugin { .. } => "Release Multi-Module".to_string(),
            CommandKind::UpdateDependency { dependency } => {
                format!("Update dependency {dependency}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_command_marker() {
        let single = Command::release_plugin(false, "1.1.0-SNAPSHOT", CommandState::Ready);
        let multi = Command::release_plugin(true, "1.1.0-SNAPSHOT", CommandState::Ready);
        let update = Command::update_dependency(
            ProjectId::new("g:a"),
            CommandState::waiting_for(ProjectId::new("g:a")),
        );
        assert!(single.is_release_command());
        assert!(multi.is_release_command());
        assert!(!update.is_release_command());
        assert_eq!(update.updated_dependency(), Some(&ProjectId::new("g:a")));
        assert_eq!(multi.next_dev_version(), Some("1.1.0-SNAPSHOT"));
        assert_eq!(update.title(), "Update dependency g:a");
    }
}
