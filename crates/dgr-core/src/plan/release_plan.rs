//! The release plan aggregate and its read-only queries.
//!
//! A [`ReleasePlan`] is produced by [`crate::plan::ReleasePlanBuilder`]. Its
//! structure (projects, submodules, dependents) is fixed afterwards; only
//! command states, build urls, release versions and the release state change,
//! see [`crate::plan::manipulation`].

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::config::{self, Config, ConfigKey};
use crate::domain::error::{ReleaseError, Result};
use crate::domain::project::{Project, ProjectId};
use crate::domain::release_state::{ReleaseState, TypeOfRun};
use crate::plan::level_iterator::LevelIterator;

/// Projects to release, starting with `root_project_id`.
///
/// `dependents` maps a dependency to the projects depending on it and has an
/// entry for every project. Every id used as dependent or submodule is a key
/// of `projects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePlan {
    release_id: String,
    pub(crate) state: ReleaseState,
    type_of_run: TypeOfRun,
    root_project_id: ProjectId,
    pub(crate) projects: BTreeMap<ProjectId, Project>,
    submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    dependents: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    warnings: Vec<String>,
    infos: Vec<String>,
    config: Config,
}

/// Everything a [`ReleasePlan`] is made of.
#[derive(Debug, Clone)]
pub struct ReleasePlanParts {
    pub release_id: String,
    pub state: ReleaseState,
    pub type_of_run: TypeOfRun,
    pub root_project_id: ProjectId,
    pub projects: BTreeMap<ProjectId, Project>,
    pub submodules: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    pub dependents: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
    pub config: Config,
}

impl ReleasePlan {
    /// Assembles a plan, failing if the structural invariants do not hold.
    pub fn from_parts(parts: ReleasePlanParts) -> Result<Self> {
        let plan = Self {
            release_id: parts.release_id,
            state: parts.state,
            type_of_run: parts.type_of_run,
            root_project_id: parts.root_project_id,
            projects: parts.projects,
            submodules: parts.submodules,
            dependents: parts.dependents,
            warnings: parts.warnings,
            infos: parts.infos,
            config: parts.config,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Copy of this plan with `projects` replaced; the structure must stay the same.
    pub fn with_projects(&self, projects: BTreeMap<ProjectId, Project>) -> Result<Self> {
        let plan = Self {
            projects,
            ..self.clone()
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        let known = |id: &ProjectId, role: &str| -> Result<()> {
            if self.projects.contains_key(id) {
                Ok(())
            } else {
                Err(ReleaseError::IllegalState(format!(
                    "{role} {id} is not part of the projects of release {}",
                    self.release_id
                )))
            }
        };
        known(&self.root_project_id, "root project")?;
        for (id, project) in &self.projects {
            if *id != project.id {
                return Err(ReleaseError::IllegalState(format!(
                    "project stored under {id} has id {}",
                    project.id
                )));
            }
            if !self.dependents.contains_key(id) {
                return Err(ReleaseError::IllegalState(format!(
                    "dependents of project {id} are missing"
                )));
            }
        }
        for (dependency, dependents) in &self.dependents {
            known(dependency, "dependency")?;
            for dependent in dependents {
                known(dependent, "dependent")?;
            }
        }
        for (multi_module, submodules) in &self.submodules {
            known(multi_module, "multi module")?;
            for submodule in submodules {
                known(submodule, "submodule")?;
            }
        }
        Ok(())
    }

    pub fn release_id(&self) -> &str {
        &self.release_id
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    pub fn type_of_run(&self) -> TypeOfRun {
        self.type_of_run
    }

    pub fn root_project_id(&self) -> &ProjectId {
        &self.root_project_id
    }

    pub fn root_project(&self) -> Result<&Project> {
        self.project(&self.root_project_id)
    }

    pub fn project(&self, project_id: &ProjectId) -> Result<&Project> {
        self.projects
            .get(project_id)
            .ok_or_else(|| ReleaseError::ProjectNotFound(project_id.clone()))
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn number_of_projects(&self) -> usize {
        self.projects.len()
    }

    /// Direct submodules; empty for projects which are not multi modules.
    pub fn submodules(&self, project_id: &ProjectId) -> Result<&BTreeSet<ProjectId>> {
        static NONE: BTreeSet<ProjectId> = BTreeSet::new();
        if !self.projects.contains_key(project_id) {
            return Err(ReleaseError::ProjectNotFound(project_id.clone()));
        }
        Ok(self.submodules.get(project_id).unwrap_or(&NONE))
    }

    pub fn has_submodules(&self, project_id: &ProjectId) -> Result<bool> {
        Ok(!self.submodules(project_id)?.is_empty())
    }

    pub fn dependents(&self, project_id: &ProjectId) -> Result<&BTreeSet<ProjectId>> {
        self.dependents
            .get(project_id)
            .ok_or_else(|| ReleaseError::ProjectNotFound(project_id.clone()))
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_value(&self, key: ConfigKey) -> Result<&str> {
        config::require(&self.config, key)
    }

    /// Dependents of `multi_module_id`, of its submodules and of nested submodules.
    ///
    /// Each entry is `(multi module or submodule, dependent)`.
    pub fn collect_dependents_incl_dependents_of_all_submodules(
        &self,
        multi_module_id: &ProjectId,
    ) -> Result<BTreeSet<(ProjectId, ProjectId)>> {
        let mut pairs = BTreeSet::new();
        let mut to_visit = vec![multi_module_id.clone()];
        while let Some(project_id) = to_visit.pop() {
            for dependent in self.dependents(&project_id)? {
                pairs.insert((project_id.clone(), dependent.clone()));
            }
            to_visit.extend(self.submodules(&project_id)?.iter().cloned());
        }
        Ok(pairs)
    }

    /// Projects in level order, starting with the root project.
    pub fn iter(&self) -> ReleasePlanIter<'_> {
        let root = self.projects.get(&self.root_project_id);
        ReleasePlanIter {
            plan: self,
            level_iterator: LevelIterator::new((self.root_project_id.clone(), root)),
            visited: HashSet::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a plan and checks its structural invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let plan: ReleasePlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }
}

/// Level-ordered iterator over the projects of a [`ReleasePlan`].
///
/// Submodules are yielded on the level of their multi module.
pub struct ReleasePlanIter<'a> {
    plan: &'a ReleasePlan,
    level_iterator: LevelIterator<ProjectId, Option<&'a Project>>,
    visited: HashSet<ProjectId>,
}

impl<'a> Iterator for ReleasePlanIter<'a> {
    type Item = &'a Project;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (project_id, project) = self.level_iterator.next()?;
            let Some(project) = project else { continue };
            if !self.visited.insert(project_id) {
                continue;
            }
            let dependents = self.plan.dependents.get(&project.id).into_iter().flatten();
            for dependent in dependents
                .filter(|id| !self.visited.contains(*id))
                .filter_map(|id| self.plan.projects.get(id))
            {
                if dependent.is_submodule && dependent.level == project.level {
                    self.level_iterator
                        .add_to_current_level((dependent.id.clone(), Some(dependent)));
                } else if dependent.level == project.level + 1 {
                    self.level_iterator
                        .add_to_next_level((dependent.id.clone(), Some(dependent)));
                }
            }
            return Some(project);
        }
    }
}
