//! Best-effort publication of the current plan state.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::domain::error::{ReleaseError, Result};
use crate::plan::ReleasePlan;

/// Persists the plan so that other parties (a UI, a later resume) see the
/// current command states.
#[async_trait::async_trait]
pub trait StatePublisher: Send + Sync {
    /// Returns `false` if nothing changed since the last publication.
    async fn publish(&self, plan: &ReleasePlan) -> Result<bool>;
}

/// Publishes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait::async_trait]
impl StatePublisher for NoopPublisher {
    async fn publish(&self, _plan: &ReleasePlan) -> Result<bool> {
        Ok(false)
    }
}

/// Writes the plan as JSON to a file, replacing it atomically.
#[derive(Debug)]
pub struct JsonFilePublisher {
    path: PathBuf,
    last_published: Mutex<Option<String>>,
}

impl JsonFilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_published: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StatePublisher for JsonFilePublisher {
    async fn publish(&self, plan: &ReleasePlan) -> Result<bool> {
        let json = plan.to_json()?;
        let mut last_published = self.last_published.lock().await;
        if last_published.as_deref() == Some(json.as_str()) {
            return Ok(false);
        }

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| ReleaseError::Publish(format!("{} is not a file", self.path.display())))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        *last_published = Some(json);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::domain::config::Config;
    use crate::domain::project::{Project, ProjectId};
    use crate::domain::release_state::{ReleaseState, TypeOfRun};
    use crate::plan::ReleasePlanParts;

    fn plan() -> ReleasePlan {
        let id = ProjectId::new("root");
        let root = Project {
            id: id.clone(),
            is_submodule: false,
            current_version: "1.0-SNAPSHOT".to_string(),
            release_version: "1.0".to_string(),
            level: 0,
            commands: vec![],
            relative_path: String::new(),
        };
        ReleasePlan::from_parts(ReleasePlanParts {
            release_id: "r".to_string(),
            state: ReleaseState::Ready,
            type_of_run: TypeOfRun::Release,
            root_project_id: id.clone(),
            projects: BTreeMap::from([(id.clone(), root)]),
            submodules: BTreeMap::new(),
            dependents: BTreeMap::from([(id, BTreeSet::new())]),
            warnings: vec![],
            infos: vec![],
            config: Config::new(),
        })
        .expect("valid plan")
    }

    #[tokio::test]
    async fn test_json_file_publisher_skips_unchanged_state() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = JsonFilePublisher::new(dir.path().join("release.json"));
        let mut plan = plan();

        assert!(publisher.publish(&plan).await.unwrap());
        assert!(!publisher.publish(&plan).await.unwrap());

        plan.transition_release_state(ReleaseState::InProgress).unwrap();
        assert!(publisher.publish(&plan).await.unwrap());

        let written = std::fs::read_to_string(publisher.path()).unwrap();
        let back = ReleasePlan::from_json(&written).unwrap();
        assert_eq!(back.state(), ReleaseState::InProgress);
    }

    #[tokio::test]
    async fn test_publish_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = JsonFilePublisher::new(dir.path().join("missing").join("release.json"));
        assert!(matches!(
            publisher.publish(&plan()).await,
            Err(ReleaseError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_noop_publisher() {
        assert!(!NoopPublisher.publish(&plan()).await.unwrap());
    }
}
