//! Structured observability hooks for the release lifecycle.
//!
//! This module provides:
//! - Release-scoped tracing spans via the `ReleaseSpan` RAII guard
//! - Emission functions for plan construction, release start/finish, per-project
//!   results and command state changes
//!
//! Events are emitted with an `event` field so they can be filtered in JSON
//! output (`dgr --json`).

use tracing::{error, info, warn};

use crate::domain::command_state::CommandState;
use crate::domain::project::ProjectId;
use crate::plan::ReleasePlan;

/// RAII guard that enters a release-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = ReleaseSpan::enter("release-42");
/// // all tracing calls are now associated with release_id = "release-42"
/// ```
pub struct ReleaseSpan {
    _span: tracing::span::EnteredSpan,
}

impl ReleaseSpan {
    pub fn enter(release_id: &str) -> Self {
        let span = tracing::info_span!("dgr.release", release_id = %release_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a release plan was built.
pub fn emit_plan_built(plan: &ReleasePlan) {
    info!(
        event = "plan.built",
        release_id = %plan.release_id(),
        root = %plan.root_project_id(),
        projects = plan.number_of_projects() as u64,
        warnings = plan.warnings().len() as u64,
        infos = plan.infos().len() as u64,
    );
}

pub fn emit_release_started(release_id: &str, root: &ProjectId) {
    info!(event = "release.started", release_id = %release_id, root = %root);
}

/// Emit event: release finished with duration and outcome.
pub fn emit_release_finished(release_id: &str, duration_ms: u64, projects: u64, success: bool) {
    info!(
        event = "release.finished",
        release_id = %release_id,
        duration_ms = duration_ms,
        projects = projects,
        success = success,
    );
}

/// Emit event: all commands of a project (incl. submodules) resolved.
pub fn emit_project_finished(project_id: &ProjectId, result: &CommandState) {
    info!(event = "project.finished", project_id = %project_id, result = %result);
}

pub fn emit_command_state_changed(
    project_id: &ProjectId,
    index: usize,
    previous: &CommandState,
    new: &CommandState,
) {
    info!(
        event = "command.state_changed",
        project_id = %project_id,
        index = index as u64,
        from = %previous,
        to = %new,
    );
}

/// Emit event: publishing the plan state failed (warning level, never fatal).
pub fn emit_save_failed(release_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "save.failed", release_id = %release_id, error = %error);
}

/// Emit event: the release did not succeed although no project failed.
pub fn emit_release_inconsistent(release_id: &str, stuck: &[(ProjectId, CommandState)]) {
    let stuck = stuck
        .iter()
        .map(|(id, state)| format!("{id}: {state}"))
        .collect::<Vec<_>>()
        .join(", ");
    error!(
        event = "release.inconsistent",
        release_id = %release_id,
        stuck = %stuck,
        "release failed without a failed project, some projects did not reach an end state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_span_create() {
        let _span = ReleaseSpan::enter("test-release");
        emit_release_started("test-release", &ProjectId::new("g:a"));
        emit_release_inconsistent(
            "test-release",
            &[(ProjectId::new("g:b"), CommandState::Ready)],
        );
    }
}
