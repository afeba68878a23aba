//! Project identity and the per-project release unit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::command::Command;

/// Opaque identifier of a project, e.g. a Maven `groupId:artifactId` coordinate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// Builds the identifier of a Maven coordinate.
    pub fn maven(group_id: &str, artifact_id: &str) -> Self {
        Self(format!("{group_id}:{artifact_id}"))
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }

    /// The last `:`-separated segment, i.e. the artifact id of a Maven coordinate.
    pub fn artifact_id(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

/// One release unit of a [`crate::plan::ReleasePlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub is_submodule: bool,
    pub current_version: String,
    /// Version the project is released with; may be changed before the release starts.
    pub release_version: String,
    /// Distance from the root project in the dependents graph.
    pub level: u32,
    pub commands: Vec<Command>,
    pub relative_path: String,
}

impl Project {
    pub fn has_release_command(&self) -> bool {
        self.commands.iter().any(Command::is_release_command)
    }
}

/// One edge reported by an [`crate::analyser::Analyser`]: `id` depends on the queried project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: ProjectId,
    pub current_version: String,
    /// `false` if the dependency version is inherited (e.g. from a parent), so
    /// no update-dependency command is needed for this edge.
    pub is_dependency_version_self_managed: bool,
}

impl Relation {
    pub fn new(id: ProjectId, current_version: impl Into<String>, self_managed: bool) -> Self {
        Self {
            id,
            current_version: current_version.into(),
            is_dependency_version_self_managed: self_managed,
        }
    }
}
